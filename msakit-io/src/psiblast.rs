//! PSI-BLAST input format.
//!
//! ```text
//! seq1   ACDEfgh-IK
//! seq22  ACD-fg--IK
//!
//! seq1   LMNP
//! seq22  LMNP
//! ```
//!
//! Interleaved blocks of `name sequence` lines, separated by blank lines.
//! Within a block every sequence field starts and ends in the same column.
//! Upper case residues mark consensus columns, lower case residues mark
//! insert columns; `-` is the only gap symbol.

use std::io::Write;
use std::ops::Range;

use msakit_alphabet::DSQ_ILLEGAL;
use msakit_core::{ErrorKind, LineSource, Result};

use crate::format::WriteOptions;
use crate::msa::{Msa, Residues};
use crate::msafile::MsaFile;

const CONSENSUS: u8 = b'X';
const INSERT: u8 = b'.';
const NEUTRAL: u8 = b'-';

pub(crate) fn configure_inmap(inmap: &mut [u8; 256]) {
    for &c in b"._*~Oo" {
        inmap[c as usize] = DSQ_ILLEGAL;
    }
}

pub(crate) fn residue_field(line: &[u8]) -> Option<&[u8]> {
    let line = line.trim_ascii_start();
    if line.is_empty() {
        return None;
    }
    let name_end = line
        .iter()
        .position(|c| c.is_ascii_whitespace())
        .unwrap_or(line.len());
    Some(&line[name_end..])
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|c| c.is_ascii_whitespace())
}

/// Locate the name and the sequence field of an alignment line.
fn split_alignment_line(line: &[u8]) -> Option<(Range<usize>, Range<usize>)> {
    let is_space = |c: &u8| c.is_ascii_whitespace();

    let name_start = line.iter().position(|c| !is_space(c))?;
    let name_end = line[name_start..]
        .iter()
        .position(is_space)
        .map_or(line.len(), |n| name_start + n);
    let seq_start = name_end + line[name_end..].iter().position(|c| !is_space(c))?;
    let seq_end = line.iter().rposition(|c| !is_space(c))? + 1;
    Some((name_start..name_end, seq_start..seq_end))
}

pub(crate) fn read<S: LineSource>(file: &mut MsaFile<S>) -> Result<Option<Msa>> {
    loop {
        if !file.next_line()? {
            return Ok(None);
        }
        if !is_blank(file.current_line()) {
            break;
        }
    }

    let mut msa = Msa::new(file.alphabet().cloned())?;
    // raw bytes, so later blocks are matched exactly
    let mut names: Vec<Vec<u8>> = Vec::new();
    let mut rows: Vec<Residues> = Vec::new();
    let mut reference: Vec<u8> = Vec::new();
    let mut alen = 0;
    let mut nblocks = 0;

    loop {
        let mut idx = 0;
        let mut block_field: Option<(usize, usize)> = None;

        loop {
            let line = file.current_line();
            let Some((name, seq)) = split_alignment_line(line) else {
                return Err(file.fail(ErrorKind::StructuralMismatch, "invalid alignment line"));
            };

            match block_field {
                None => block_field = Some((seq.start, seq.len())),
                Some((start, _)) if seq.start != start => {
                    return Err(file.fail(
                        ErrorKind::StructuralMismatch,
                        "sequence start is misaligned",
                    ));
                }
                Some((_, len)) if seq.len() != len => {
                    return Err(file.fail(ErrorKind::StructuralMismatch, "sequence end is misaligned"));
                }
                Some(_) => {}
            }

            if idx == 0 {
                reference.try_reserve(seq.len())?;
                reference.resize(alen + seq.len(), NEUTRAL);
            }
            for (pos, &c) in line[seq.clone()].iter().enumerate() {
                let col = &mut reference[alen + pos];
                if c.is_ascii_uppercase() {
                    if *col == INSERT {
                        return Err(file.fail(
                            ErrorKind::StructuralMismatch,
                            format!("unexpected upper case residue (#{} on line)", pos + 1),
                        ));
                    }
                    *col = CONSENSUS;
                } else if c.is_ascii_lowercase() {
                    if *col == CONSENSUS {
                        return Err(file.fail(
                            ErrorKind::StructuralMismatch,
                            format!("unexpected lower case residue (#{} on line)", pos + 1),
                        ));
                    }
                    *col = INSERT;
                }
            }

            let name = &line[name];
            if nblocks == 0 {
                names.push(name.to_vec());
                rows.push(msa.empty_residues());
            } else {
                match names.get(idx) {
                    Some(expected) if expected.as_slice() == name => {}
                    Some(expected) => {
                        return Err(file.fail(
                            ErrorKind::StructuralMismatch,
                            format!(
                                "unexpected record: expected sequence {} on this line, but saw {}",
                                String::from_utf8_lossy(expected),
                                String::from_utf8_lossy(name)
                            ),
                        ));
                    }
                    None => {
                        return Err(file.fail(
                            ErrorKind::StructuralMismatch,
                            format!(
                                "unexpected record {}: block has more sequences than the first",
                                String::from_utf8_lossy(name)
                            ),
                        ));
                    }
                }
            }

            let appended = file.append_field(&mut rows[idx], seq.clone())?;
            if appended != seq.len() {
                return Err(file.fail(
                    ErrorKind::StructuralMismatch,
                    "unexpected number of seq characters",
                ));
            }

            idx += 1;
            if !file.next_line()? || is_blank(file.current_line()) {
                break;
            }
        }

        if nblocks > 0 && idx != names.len() {
            return Err(file.fail_here(
                ErrorKind::StructuralMismatch,
                "last block didn't contain same # of seqs as earlier blocks",
            ));
        }
        alen += block_field.map_or(0, |(_, len)| len);
        nblocks += 1;

        let mut more = false;
        while file.next_line()? {
            if !is_blank(file.current_line()) {
                more = true;
                break;
            }
        }
        if !more {
            break;
        }
    }

    for (name, residues) in names.iter().zip(rows) {
        msa.push_parsed(String::from_utf8_lossy(name).into_owned(), None, residues)?;
    }
    msa.set_alen(alen);
    msa.set_reference_unchecked(reference);
    log::debug!(
        "read PSI-BLAST alignment: {} sequences, {} columns in {} blocks",
        msa.nseq(),
        msa.alen(),
        nblocks
    );
    Ok(Some(msa))
}

/// Whether column `col` is a consensus column: alphanumeric in the reference
/// annotation if there is one, otherwise a residue in the first record.
fn is_consensus(msa: &Msa, col: usize) -> bool {
    if let Some(reference) = msa.reference() {
        return reference[col].is_ascii_alphanumeric();
    }
    match (msa.alphabet(), msa.record(0).map(|r| r.residues())) {
        (Some(abc), Some(Residues::Digital(dsq))) => abc.is_residue(dsq.as_slice()[col]),
        (_, Some(residues)) => residues.as_bytes()[col].is_ascii_alphanumeric(),
        (_, None) => false,
    }
}

/// Write `msa` in PSI-BLAST format.
///
/// Consensus columns get upper case residues and insert columns lower case
/// residues. PSI-BLAST has a single gap symbol, so gaps, missing data and
/// anything else that is not a residue are all written as `-`.
pub(crate) fn write<W: Write>(writer: &mut W, msa: &Msa, options: &WriteOptions) -> Result<()> {
    msa.validate()?;
    let width = options.width();
    let name_width = msa
        .records()
        .iter()
        .map(|r| r.name().len())
        .max()
        .unwrap_or(0);
    let mut buf = Vec::with_capacity(width);

    for start in (0..msa.alen()).step_by(width) {
        let end = msa.alen().min(start + width);
        for record in msa.records() {
            buf.clear();
            for col in start..end {
                let (sym, is_residue) = match (msa.alphabet(), record.residues()) {
                    (Some(abc), Residues::Digital(dsq)) => {
                        let x = dsq.as_slice()[col];
                        let is_residue = abc.is_residue(x);
                        (if is_residue { abc.symbol(x) } else { NEUTRAL }, is_residue)
                    }
                    (_, residues) => {
                        let c = residues.as_bytes()[col];
                        (c, c.is_ascii_alphanumeric())
                    }
                };
                buf.push(match (is_residue, is_consensus(msa, col)) {
                    (false, _) => NEUTRAL,
                    (true, true) => sym.to_ascii_uppercase(),
                    (true, false) => sym.to_ascii_lowercase(),
                });
            }
            writeln!(
                writer,
                "{:<width$}  {}",
                record.name(),
                String::from_utf8_lossy(&buf),
                width = name_width
            )?;
        }
        if end < msa.alen() {
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use msakit_alphabet::Alphabet;
    use msakit_core::LineBuffer;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::format::MsaFormat;

    const EXAMPLE: &str = "seq1   ACDEfgh-IK\nseq22  ACD-fg--IK\n\nseq1   LMNP\nseq22  LMNP\n";

    fn text_session(input: &str) -> MsaFile {
        MsaFile::new(LineBuffer::from_bytes(input), MsaFormat::Psiblast, None)
    }

    fn write_to_string(msa: &Msa, line_width: usize) -> String {
        let mut out = Vec::new();
        write(&mut out, msa, &WriteOptions::with_line_width(line_width)).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn failure_message(input: &str) -> (String, u64) {
        let err = text_session(input).read().unwrap_err();
        let failure = err.parse_failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::StructuralMismatch);
        (failure.message.clone(), failure.line_number)
    }

    #[test]
    fn test_read_example() {
        let msa = text_session(EXAMPLE).read().unwrap().unwrap();
        assert_eq!(msa.nseq(), 2);
        assert_eq!(msa.alen(), 14);
        assert_eq!(msa.record(1).unwrap().name(), "seq22");
        assert_eq!(msa.record(1).unwrap().residues().as_bytes(), b"ACD-fg--IKLMNP");
        assert_eq!(msa.reference(), Some(b"XXXX...-XXXXXX".as_slice()));
    }

    #[test]
    fn test_read_digital() {
        let amino = Arc::new(Alphabet::amino().unwrap());
        let mut file = MsaFile::new(LineBuffer::from_bytes(EXAMPLE), MsaFormat::Psiblast, Some(amino));
        let msa = file.read().unwrap().unwrap();
        assert!(msa.is_digital());
        assert_eq!(&msa.record(0).unwrap().residues().as_bytes()[..4], &[0, 1, 2, 3]);
    }

    #[rstest]
    #[case("")]
    #[case("\n  \n")]
    fn test_no_alignment_data(#[case] input: &str) {
        assert!(text_session(input).read().unwrap().is_none());
    }

    #[test]
    fn test_misaligned_start() {
        let input = "seq1   ACDE\nseq22  ACDE\n\nseq1  LMNP\nseq22  LMNP\n";
        let (message, line_number) = failure_message(input);
        assert!(message.contains("misaligned"));
        assert_eq!(message, "sequence start is misaligned");
        assert_eq!(line_number, 5);
    }

    #[test]
    fn test_misaligned_end() {
        let input = "seq1   ACDE\nseq22  ACD\n";
        assert_eq!(failure_message(input), ("sequence end is misaligned".to_string(), 2));
    }

    #[test]
    fn test_unexpected_record() {
        let input = "seq1   ACDE\nseq22  ACDE\n\nseqX   LMNP\nseq22  LMNP\n";
        let (message, line_number) = failure_message(input);
        assert!(message.starts_with("unexpected record"));
        assert!(message.contains("seq1"));
        assert_eq!(line_number, 4);
    }

    #[test]
    fn test_non_utf8_names_match_across_blocks() {
        let input = b"prot\xe9  ACDE\nq      ACDE\n\nprot\xe9  LMNP\nq      LMNP\n".to_vec();
        let mut file = MsaFile::new(LineBuffer::from_bytes(input), MsaFormat::Psiblast, None);
        let msa = file.read().unwrap().unwrap();
        assert_eq!(msa.nseq(), 2);
        assert_eq!(msa.alen(), 8);
        assert_eq!(msa.record(0).unwrap().name(), "prot\u{fffd}");
        assert_eq!(msa.record(0).unwrap().residues().as_bytes(), b"ACDELMNP");
    }

    #[test]
    fn test_extra_record_in_later_block() {
        let input = "a  AC\nb  AC\n\na  AC\nb  AC\nc  AC\n";
        let (message, _) = failure_message(input);
        assert!(message.starts_with("unexpected record c"));
    }

    #[test]
    fn test_short_later_block() {
        let input = "a  AC\nb  AC\n\na  AC\n";
        let (message, _) = failure_message(input);
        assert_eq!(message, "last block didn't contain same # of seqs as earlier blocks");
    }

    #[test]
    fn test_case_conflicts() {
        let (message, _) = failure_message("a  Ab\nb  aB\n");
        assert_eq!(message, "unexpected lower case residue (#1 on line)");
        let (message, _) = failure_message("a  Ab\nb  AB\n");
        assert_eq!(message, "unexpected upper case residue (#2 on line)");
    }

    #[test]
    fn test_line_without_sequence() {
        assert_eq!(
            failure_message("a  ACGT\nb\n"),
            ("invalid alignment line".to_string(), 2)
        );
    }

    #[test]
    fn test_banned_characters() {
        for input in ["a  AC.T\n", "a  AC*T\n", "a  ACoT\n"] {
            let err = text_session(input).read().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidSymbol);
        }
    }

    #[test]
    fn test_ignored_characters_are_counted() {
        let mut dna = Alphabet::dna().unwrap();
        dna.set_ignored(b"=");
        let mut file = MsaFile::new(
            LineBuffer::from_bytes("a  AC=T\n"),
            MsaFormat::Psiblast,
            Some(Arc::new(dna)),
        );
        let err = file.read().unwrap_err();
        assert_eq!(
            err.parse_failure().unwrap().message,
            "unexpected number of seq characters"
        );
    }

    #[test]
    fn test_write_read_round_trip() {
        let msa = text_session(EXAMPLE).read().unwrap().unwrap();
        assert_eq!(write_to_string(&msa, 10), EXAMPLE);

        let amino = Arc::new(Alphabet::amino().unwrap());
        let mut file = MsaFile::new(LineBuffer::from_bytes(EXAMPLE), MsaFormat::Psiblast, Some(amino));
        let msa = file.read().unwrap().unwrap();
        assert_eq!(write_to_string(&msa, 10), EXAMPLE);
    }

    #[test]
    fn test_write_without_reference_uses_first_record() {
        let mut msa = Msa::new(None).unwrap();
        msa.push_sequence("a", b"AC-GT").unwrap();
        msa.push_sequence("bb", b"ACTG.").unwrap();
        assert_eq!(write_to_string(&msa, 60), "a   AC-GT\nbb  ACtG-\n");
    }

    #[test]
    fn test_write_downgrades_missing_data() {
        let amino = Arc::new(Alphabet::amino().unwrap());
        let mut msa = Msa::new(Some(amino)).unwrap();
        msa.push_sequence("x", b"AC~D").unwrap();
        assert_eq!(write_to_string(&msa, 60), "x  AC-D\n");
    }

    #[test]
    fn test_residue_field_skips_name() {
        assert_eq!(residue_field(b"PFEIL  ACGT"), Some(b"  ACGT".as_slice()));
        assert_eq!(residue_field(b"   "), None);
    }
}
