//! Aligned FASTA.
//!
//! ```text
//! >seq1 desc one
//! ACGT
//! ACGT
//! >seq2
//! ACGT
//! AC-T
//! ```
//!
//! Each record is a `>name [description]` line followed by any number of
//! residue lines. All records must have the same number of columns. Blank
//! lines, leading whitespace and embedded spaces or tabs are ignored.

use std::io::Write;

use msakit_alphabet::{DSQ_IGNORED, textize_n};
use msakit_core::{ErrorKind, LineSource, Result};

use crate::format::WriteOptions;
use crate::msa::{Msa, Residues};
use crate::msafile::MsaFile;

pub(crate) fn configure_inmap(inmap: &mut [u8; 256]) {
    inmap[b' ' as usize] = DSQ_IGNORED;
    inmap[b'\t' as usize] = DSQ_IGNORED;
}

pub(crate) fn residue_field(line: &[u8]) -> Option<&[u8]> {
    let line = line.trim_ascii_start();
    if line.is_empty() || line[0] == b'>' {
        None
    } else {
        Some(line)
    }
}

/// Split a header (without its `>`) into name and optional description.
fn parse_header(header: &[u8]) -> Option<(String, Option<String>)> {
    let header = header.trim_ascii();
    let end = header
        .iter()
        .position(|c| c.is_ascii_whitespace())
        .unwrap_or(header.len());
    if end == 0 {
        return None;
    }

    let name = String::from_utf8_lossy(&header[..end]).into_owned();
    let rest = header[end..].trim_ascii();
    let description = (!rest.is_empty()).then(|| String::from_utf8_lossy(rest).into_owned());
    Some((name, description))
}

fn leading_space(line: &[u8]) -> usize {
    line.len() - line.trim_ascii_start().len()
}

pub(crate) fn read<S: LineSource>(file: &mut MsaFile<S>) -> Result<Option<Msa>> {
    loop {
        if !file.next_line()? {
            return Ok(None);
        }
        if !file.current_line().trim_ascii().is_empty() {
            break;
        }
    }

    let mut msa = Msa::new(file.alphabet().cloned())?;
    let mut alen: Option<usize> = None;

    let mut more = true;
    while more {
        let header = file.current_line().trim_ascii_start();
        let Some(header) = header.strip_prefix(b">") else {
            return Err(file.fail(
                ErrorKind::StructuralMismatch,
                "expected aligned FASTA name/desc line starting with >",
            ));
        };
        let (name, description) = parse_header(header).ok_or_else(|| {
            file.fail(
                ErrorKind::StructuralMismatch,
                "no name found for aligned FASTA record",
            )
        })?;

        let mut residues = msa.empty_residues();
        more = false;
        while file.next_line()? {
            let line = file.current_line();
            let start = leading_space(line);
            if start == line.len() {
                continue;
            }
            if line[start] == b'>' {
                more = true;
                break;
            }
            let end = line.len();
            file.append_field(&mut residues, start..end)?;
        }

        if let Some(expected) = alen {
            if residues.len() != expected {
                return Err(file.fail(
                    ErrorKind::StructuralMismatch,
                    format!(
                        "sequence {} has alen {}; expected {}",
                        name,
                        residues.len(),
                        expected
                    ),
                ));
            }
        }
        alen = Some(residues.len());
        msa.push_parsed(name, description, residues)?;
    }

    msa.set_alen(alen.unwrap_or(0));
    log::debug!(
        "read aligned FASTA alignment: {} sequences, {} columns",
        msa.nseq(),
        msa.alen()
    );
    Ok(Some(msa))
}

/// Write `msa` as aligned FASTA.
///
/// Digital alignments are written with the alphabet's display symbols
/// (uppercase residues, `-` for gaps). Text alignments are written exactly as
/// stored.
pub(crate) fn write<W: Write>(writer: &mut W, msa: &Msa, options: &WriteOptions) -> Result<()> {
    msa.validate()?;
    let width = options.width();
    let mut buf = vec![0u8; width];

    for record in msa.records() {
        write!(writer, ">{}", record.name())?;
        if let Some(accession) = record.accession() {
            write!(writer, " {}", accession)?;
        }
        if let Some(description) = record.description() {
            write!(writer, " {}", description)?;
        }
        writeln!(writer)?;

        for start in (0..msa.alen()).step_by(width) {
            let n = width.min(msa.alen() - start);
            match (msa.alphabet(), record.residues()) {
                (Some(abc), Residues::Digital(dsq)) => {
                    textize_n(abc, dsq.as_slice(), start, n, &mut buf)?;
                    writer.write_all(&buf[..n])?;
                }
                (_, residues) => writer.write_all(&residues.as_bytes()[start..start + n])?,
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}
