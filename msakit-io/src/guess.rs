use msakit_alphabet::{AlphabetType, count_letters, guess_alphabet};
use msakit_core::{LineSource, Result};

use crate::consts::GUESS_CHECKPOINTS;

/// Picks the residue-bearing part out of one input line, or `None` for lines
/// (headers, blanks) that carry no residues.
pub type ResidueField = fn(&[u8]) -> Option<&[u8]>;

/// Guess the alphabet of the residues ahead in `source`, without moving it.
///
/// Lines are fed through `residue_field` and their letters tallied. The
/// classifier runs each time the residue count crosses one of
/// [`GUESS_CHECKPOINTS`] and once more at end of input; the first definite
/// answer wins. Whatever happens, including a failing read, `source` is put
/// back at the offset it had on entry and its anchor is released.
pub fn guess_stream_alphabet<S>(
    source: &mut S,
    residue_field: ResidueField,
) -> Result<Option<AlphabetType>>
where
    S: LineSource + ?Sized,
{
    let anchor = source.offset();
    source.set_anchor(anchor)?;

    let scanned = scan(source, residue_field);

    let rewound = source.set_offset(anchor);
    let restored = source.raise_anchor(anchor).and(rewound);

    match (scanned, restored) {
        (Ok(guess), Ok(())) => Ok(guess),
        (Err(e), _) | (Ok(_), Err(e)) => Err(e),
    }
}

fn scan<S>(source: &mut S, residue_field: ResidueField) -> Result<Option<AlphabetType>>
where
    S: LineSource + ?Sized,
{
    let mut ct = [0u64; 26];
    let mut nres = 0u64;
    let mut step = 0;
    let mut line = Vec::new();

    while source.next_line(&mut line)? {
        let Some(field) = residue_field(&line) else {
            continue;
        };
        nres += count_letters(field, &mut ct);

        if step < GUESS_CHECKPOINTS.len() && nres > GUESS_CHECKPOINTS[step] {
            if let Some(guess) = guess_alphabet(&ct) {
                log::debug!("alphabet looks like {} after {} residues", guess, nres);
                return Ok(Some(guess));
            }
            step += 1;
        }
    }

    let guess = guess_alphabet(&ct);
    log::debug!("alphabet guess at end of input ({} residues): {:?}", nres, guess);
    Ok(guess)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;

    use msakit_core::{LineBuffer, MsakitError};
    use pretty_assertions::assert_eq;

    fn whole_line(line: &[u8]) -> Option<&[u8]> {
        Some(line)
    }

    fn non_header(line: &[u8]) -> Option<&[u8]> {
        if line.starts_with(b">") { None } else { Some(line) }
    }

    #[test]
    fn test_dna_stream_rewinds() {
        let text = "ACGT".repeat(200);
        let mut buf = LineBuffer::from_bytes(format!(">x\n{}\n", text));
        let guess = guess_stream_alphabet(&mut buf, non_header).unwrap();
        assert_eq!(guess, Some(AlphabetType::Dna));
        assert_eq!(buf.offset(), 0);
        assert!(!buf.has_anchor());
    }

    #[test]
    fn test_rewinds_to_mid_stream_offset() {
        let mut buf = LineBuffer::from_bytes("skip me\nMEFILPQ\nMEFILPQ\n");
        let mut line = Vec::new();
        buf.next_line(&mut line).unwrap();
        let guess = guess_stream_alphabet(&mut buf, whole_line).unwrap();
        assert_eq!(guess, Some(AlphabetType::Amino));
        assert_eq!(buf.offset(), 8);
    }

    #[test]
    fn test_inconclusive_streams() {
        let mut empty = LineBuffer::from_bytes("");
        assert_eq!(guess_stream_alphabet(&mut empty, whole_line).unwrap(), None);

        let mut ambiguous = LineBuffer::from_bytes("NNNNNNNNNNNN\nNNNNNNNNNN\n");
        assert_eq!(guess_stream_alphabet(&mut ambiguous, whole_line).unwrap(), None);
        assert_eq!(ambiguous.offset(), 0);
    }

    #[test]
    fn test_outstanding_anchor_is_an_error() {
        let mut buf = LineBuffer::from_bytes("ACGTACGTACGTACGT\n");
        buf.set_anchor(0).unwrap();
        assert!(guess_stream_alphabet(&mut buf, whole_line).is_err());
        buf.raise_anchor(0).unwrap();
    }

    /// Serves a few lines, then fails every read.
    struct FlakySource {
        lines: Vec<&'static str>,
        served: usize,
        anchor: Option<u64>,
    }

    impl LineSource for FlakySource {
        fn offset(&self) -> u64 {
            self.served as u64
        }

        fn set_offset(&mut self, offset: u64) -> Result<()> {
            self.served = offset as usize;
            Ok(())
        }

        fn set_anchor(&mut self, offset: u64) -> Result<()> {
            if self.anchor.is_some() {
                return Err(MsakitError::InvalidArgument("anchor already set".to_string()));
            }
            self.anchor = Some(offset);
            Ok(())
        }

        fn raise_anchor(&mut self, _offset: u64) -> Result<()> {
            self.anchor = None;
            Ok(())
        }

        fn next_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool> {
            match self.lines.get(self.served) {
                Some(l) => {
                    line.clear();
                    line.extend_from_slice(l.as_bytes());
                    self.served += 1;
                    Ok(true)
                }
                None => Err(io::Error::other("device went away")),
            }
        }

        fn name(&self) -> Option<&str> {
            None
        }
    }

    #[test]
    fn test_read_failure_still_restores() {
        let mut source = FlakySource {
            lines: vec!["header", "ACGT", "ACGT"],
            served: 1,
            anchor: None,
        };
        let err = guess_stream_alphabet(&mut source, whole_line).unwrap_err();
        assert_eq!(err.kind(), msakit_core::ErrorKind::Io);
        assert_eq!(source.offset(), 1);
        assert!(source.anchor.is_none());
    }
}
