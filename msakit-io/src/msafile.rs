//! Alignment file sessions.
//!
//! An [`MsaFile`] ties one input stream to one [`MsaFormat`] and, in digital
//! mode, to a shared [`Alphabet`]. It owns the input map the parsers use,
//! which starts from the alphabet's map (or a text-mode map) and is then
//! adjusted by the format. The alphabet itself is never modified.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use msakit_alphabet::{Alphabet, AlphabetType, DSQ_ILLEGAL};
use msakit_core::utils::get_dynamic_writer;
use msakit_core::{ErrorKind, LineBuffer, LineSource, MsakitError, ParseFailure, Result};

use crate::format::{MsaFormat, WriteOptions};
use crate::guess::guess_stream_alphabet;
use crate::msa::{Msa, Residues};
use crate::{afa, psiblast};

/// An open alignment input stream.
pub struct MsaFile<S: LineSource = LineBuffer> {
    source: S,
    format: MsaFormat,
    abc: Option<Arc<Alphabet>>,
    inmap: [u8; 256],
    line: Vec<u8>,
    line_number: u64,
}

impl MsaFile<LineBuffer> {
    /// Open a file (gzipped if it ends in `.gz`).
    ///
    /// With no `format`, the format is taken from the file extension.
    pub fn open<P: AsRef<Path>>(
        path: P,
        format: Option<MsaFormat>,
        abc: Option<Arc<Alphabet>>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let format = match format {
            Some(format) => format,
            None => MsaFormat::from_path(path).ok_or_else(|| {
                MsakitError::InvalidArgument(format!(
                    "cannot tell the alignment format of {} from its name",
                    path.display()
                ))
            })?,
        };

        log::info!("opening {} as {} alignment", path.display(), format);
        let source = LineBuffer::from_path(path)?;
        Ok(Self::new(source, format, abc))
    }
}

impl<S: LineSource> MsaFile<S> {
    /// Start a session on `source`. Without an alphabet the session reads in
    /// text mode.
    pub fn new(source: S, format: MsaFormat, abc: Option<Arc<Alphabet>>) -> Self {
        let inmap = build_inmap(format, abc.as_deref());
        MsaFile {
            source,
            format,
            abc,
            inmap,
            line: Vec::new(),
            line_number: 0,
        }
    }

    pub fn format(&self) -> MsaFormat {
        self.format
    }

    pub fn alphabet(&self) -> Option<&Arc<Alphabet>> {
        self.abc.as_ref()
    }

    /// Input map in effect for this session.
    pub fn inmap(&self) -> &[u8; 256] {
        &self.inmap
    }

    /// Number of lines consumed so far; 1-based once reading has started.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// The last line read, without its terminator.
    pub fn current_line(&self) -> &[u8] {
        &self.line
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Guess the alphabet of the alignment ahead without consuming it.
    pub fn guess_alphabet(&mut self) -> Result<Option<AlphabetType>> {
        guess_stream_alphabet(&mut self.source, self.format.residue_field())
    }

    /// Switch the session to digital mode with `abc`.
    pub fn set_digital(&mut self, abc: Arc<Alphabet>) {
        self.inmap = build_inmap(self.format, Some(abc.as_ref()));
        self.abc = Some(abc);
    }

    /// Guess the alphabet and, if that succeeds, switch to digital mode.
    ///
    /// Returns the alphabet now in use, or `None` if the guess was
    /// inconclusive (the session then stays as it was).
    pub fn guess_and_set_digital(&mut self) -> Result<Option<Arc<Alphabet>>> {
        match self.guess_alphabet()? {
            Some(alphabet_type) => {
                let abc = Arc::new(Alphabet::new(alphabet_type)?);
                self.set_digital(abc.clone());
                Ok(Some(abc))
            }
            None => Ok(None),
        }
    }

    /// Read the next alignment.
    ///
    /// Returns `Ok(None)` if there is no more alignment data. On a format
    /// error the partial alignment is dropped and the error carries a
    /// [`ParseFailure`]; the stream is left at the start of the line after
    /// the offending one.
    pub fn read(&mut self) -> Result<Option<Msa>> {
        match self.format {
            MsaFormat::Afa => afa::read(self),
            MsaFormat::Psiblast => psiblast::read(self),
        }
    }

    /// Fetch the next line into the session buffer. Returns `false` at end
    /// of input.
    pub(crate) fn next_line(&mut self) -> Result<bool> {
        let more = self.source.next_line(&mut self.line)?;
        if more {
            self.line_number += 1;
        }
        Ok(more)
    }

    /// Map bytes `field` of the current line into `residues`.
    ///
    /// An illegal character becomes a diagnostic for the current line.
    pub(crate) fn append_field(&self, residues: &mut Residues, field: Range<usize>) -> Result<usize> {
        residues
            .append_line(&self.inmap, &self.line[field])
            .map_err(|e| match e {
                MsakitError::InvalidSymbol { .. } => self.fail(
                    ErrorKind::InvalidSymbol,
                    "one or more invalid sequence characters",
                ),
                other => other,
            })
    }

    /// Build the diagnostic for a failure on the current line.
    pub(crate) fn fail<M: Into<String>>(&self, kind: ErrorKind, message: M) -> MsakitError {
        ParseFailure {
            kind,
            message: message.into(),
            line_number: self.line_number,
            line: self.line.clone(),
            source_name: self.source.name().map(|s| s.to_string()),
        }
        .into()
    }

    /// Build the diagnostic for a failure detected at end of a block or of
    /// the input, when the current line is not itself at fault.
    pub(crate) fn fail_here<M: Into<String>>(&self, kind: ErrorKind, message: M) -> MsakitError {
        ParseFailure {
            kind,
            message: message.into(),
            line_number: self.line_number,
            line: Vec::new(),
            source_name: self.source.name().map(|s| s.to_string()),
        }
        .into()
    }
}

/// Seed a session input map: the alphabet's map in digital mode, or every
/// printable byte mapped to itself in text mode; then apply the format's
/// overrides.
fn build_inmap(format: MsaFormat, abc: Option<&Alphabet>) -> [u8; 256] {
    let mut inmap = match abc {
        Some(abc) => *abc.inmap(),
        None => {
            let mut inmap = [DSQ_ILLEGAL; 256];
            for c in 0u8..=255 {
                if c.is_ascii_graphic() {
                    inmap[c as usize] = c;
                }
            }
            inmap
        }
    };
    format.configure_inmap(&mut inmap);
    inmap
}

/// Read the first alignment in a file.
///
/// With no `format` it is taken from the file extension; with no alphabet
/// the alignment is read in text mode.
pub fn read_msa_file<P: AsRef<Path>>(
    path: P,
    format: Option<MsaFormat>,
    abc: Option<Arc<Alphabet>>,
) -> Result<Option<Msa>> {
    let mut file = MsaFile::open(path, format, abc)?;
    file.read()
}

/// Write `msa` to a file, gzipped if the path ends in `.gz`.
pub fn write_msa_file<P: AsRef<Path>>(path: P, format: MsaFormat, msa: &Msa) -> Result<()> {
    let path = path.as_ref();
    log::info!(
        "writing {} sequences x {} columns to {} as {}",
        msa.nseq(),
        msa.alen(),
        path.display(),
        format
    );
    let mut writer = get_dynamic_writer(path)?;
    format.write(&mut writer, msa, &WriteOptions::STANDARD)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    use msakit_alphabet::DSQ_IGNORED;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_mode_inmap() {
        let file = MsaFile::new(LineBuffer::from_bytes(""), MsaFormat::Afa, None);
        assert_eq!(file.inmap()[b'a' as usize], b'a');
        assert_eq!(file.inmap()[b'~' as usize], b'~');
        assert_eq!(file.inmap()[b' ' as usize], DSQ_IGNORED);
        assert_eq!(file.inmap()[0x07], DSQ_ILLEGAL);

        let file = MsaFile::new(LineBuffer::from_bytes(""), MsaFormat::Psiblast, None);
        assert_eq!(file.inmap()[b'.' as usize], DSQ_ILLEGAL);
        assert_eq!(file.inmap()[b'o' as usize], DSQ_ILLEGAL);
        assert_eq!(file.inmap()[b'-' as usize], b'-');
    }

    #[test]
    fn test_set_digital_keeps_alphabet_untouched() {
        let amino = Arc::new(Alphabet::amino().unwrap());
        let mut file = MsaFile::new(LineBuffer::from_bytes(""), MsaFormat::Psiblast, None);
        file.set_digital(amino.clone());

        assert!(file.alphabet().is_some());
        assert_eq!(file.inmap()[b'O' as usize], DSQ_ILLEGAL);
        assert_eq!(file.inmap()[b'.' as usize], DSQ_ILLEGAL);
        // the shared alphabet still accepts both
        assert_eq!(amino.digitize_symbol(b'O'), 24);
        assert_eq!(amino.digitize_symbol(b'.'), 20);
    }

    #[test]
    fn test_guess_and_set_digital() {
        let text = format!(">a\n{}\n", "ACGU".repeat(10));
        let mut file = MsaFile::new(LineBuffer::from_bytes(text), MsaFormat::Afa, None);
        let abc = file.guess_and_set_digital().unwrap().unwrap();
        assert_eq!(abc.alphabet_type(), AlphabetType::Rna);
        assert_eq!(file.line_number(), 0);

        let msa = file.read().unwrap().unwrap();
        assert!(msa.is_digital());
        assert_eq!(msa.alen(), 40);
    }

    #[test]
    fn test_guess_inconclusive_stays_text() {
        let mut file = MsaFile::new(LineBuffer::from_bytes(">a\nACGT\n"), MsaFormat::Afa, None);
        assert!(file.guess_and_set_digital().unwrap().is_none());
        assert!(file.alphabet().is_none());
    }

    #[test]
    fn test_open_needs_a_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aln.txt");
        std::fs::write(&path, ">a\nAC\n").unwrap();
        let err = MsaFile::open(&path, None, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut file = MsaFile::open(&path, Some(MsaFormat::Afa), None).unwrap();
        assert_eq!(file.read().unwrap().unwrap().nseq(), 1);
    }
}
