use std::fmt::Display;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use msakit_core::Result;
use msakit_core::utils::base_extension;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_LINE_WIDTH;
use crate::guess::ResidueField;
use crate::msa::Msa;
use crate::{afa, psiblast};

/// The alignment file formats msakit can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsaFormat {
    /// Aligned FASTA
    Afa,
    /// PSI-BLAST input format: interleaved blocks, case marks consensus
    Psiblast,
}

impl MsaFormat {
    /// Detect the format from a file extension (`.afa`, `.pb`, `.psiblast`),
    /// looking past a trailing `.gz`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        match base_extension(path.as_ref())?.as_str() {
            "afa" => Some(MsaFormat::Afa),
            "pb" | "psiblast" => Some(MsaFormat::Psiblast),
            _ => None,
        }
    }

    /// Apply this format's overrides to a session input map.
    pub fn configure_inmap(&self, inmap: &mut [u8; 256]) {
        match self {
            MsaFormat::Afa => afa::configure_inmap(inmap),
            MsaFormat::Psiblast => psiblast::configure_inmap(inmap),
        }
    }

    /// The tokenizer alphabet guessing uses for this format.
    pub fn residue_field(&self) -> ResidueField {
        match self {
            MsaFormat::Afa => afa::residue_field as ResidueField,
            MsaFormat::Psiblast => psiblast::residue_field,
        }
    }

    /// Serialize `msa` in this format.
    pub fn write<W: Write>(&self, writer: &mut W, msa: &Msa, options: &WriteOptions) -> Result<()> {
        match self {
            MsaFormat::Afa => afa::write(writer, msa, options),
            MsaFormat::Psiblast => psiblast::write(writer, msa, options),
        }
    }
}

impl Display for MsaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MsaFormat::Afa => write!(f, "afa"),
            MsaFormat::Psiblast => write!(f, "psiblast"),
        }
    }
}

impl FromStr for MsaFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "afa" => Ok(MsaFormat::Afa),
            "psiblast" | "pb" => Ok(MsaFormat::Psiblast),
            _ => Err(format!("Invalid alignment format: {}", s)),
        }
    }
}

/// Output layout options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Alignment columns per output line.
    pub line_width: usize,
}

impl WriteOptions {
    pub const STANDARD: Self = Self {
        line_width: DEFAULT_LINE_WIDTH,
    };

    pub const fn with_line_width(line_width: usize) -> Self {
        Self { line_width }
    }

    pub(crate) fn width(&self) -> usize {
        self.line_width.max(1)
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::STANDARD
    }
}
