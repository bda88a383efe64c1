use msakit_core::{MsakitError, Result};

use super::alphabet::{Alphabet, DSQ_IGNORED, DSQ_ILLEGAL};

/// An owned, growable sequence of alphabet digits.
///
/// A `DigitalSequence` only makes sense together with the [`Alphabet`] it was
/// built with; it stores its logical content and nothing else.
///
/// # Usage
///
/// 1. Build one with [`digitize`] from text, or start empty and feed text
///    line by line with [`append`].
/// 2. Render it back with [`textize`] or [`textize_n`].
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DigitalSequence {
    dsq: Vec<u8>,
}

impl DigitalSequence {
    pub fn new() -> Self {
        DigitalSequence { dsq: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DigitalSequence {
            dsq: Vec::with_capacity(capacity),
        }
    }

    /// Wrap digits that are already known to be valid for some alphabet.
    pub fn from_digits(dsq: Vec<u8>) -> Self {
        DigitalSequence { dsq }
    }

    pub fn len(&self) -> usize {
        self.dsq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dsq.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.dsq
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.dsq
    }

    pub fn clear(&mut self) {
        self.dsq.clear();
    }

    /// Number of residues: everything except gaps and missing data.
    pub fn residue_len(&self, abc: &Alphabet) -> usize {
        residue_len(abc, &self.dsq)
    }

    /// Remove the columns that are gaps (or missing) in `reference`.
    pub fn dealign(&mut self, abc: &Alphabet, reference: &[u8]) -> Result<usize> {
        dealign(abc, &mut self.dsq, reference)
    }
}

impl AsRef<[u8]> for DigitalSequence {
    fn as_ref(&self) -> &[u8] {
        &self.dsq
    }
}

impl From<DigitalSequence> for Vec<u8> {
    fn from(seq: DigitalSequence) -> Self {
        seq.dsq
    }
}

/// Convert text into a new digital sequence.
///
/// Ignored bytes are dropped. Any illegal byte fails the whole conversion.
pub fn digitize<T: AsRef<[u8]>>(abc: &Alphabet, text: T) -> Result<DigitalSequence> {
    let text = text.as_ref();
    let mut seq = DigitalSequence::new();
    seq.dsq.try_reserve(text.len())?;
    append(abc.inmap(), &mut seq, text)?;
    Ok(seq)
}

/// Render digits as the alphabet's display symbols.
pub fn textize(abc: &Alphabet, dsq: &[u8]) -> Result<Vec<u8>> {
    let mut text = Vec::new();
    text.try_reserve(dsq.len())?;
    for (position, &x) in dsq.iter().enumerate() {
        if !abc.is_valid(x) {
            return Err(MsakitError::InvalidSymbol {
                symbol: x,
                position,
            });
        }
        text.push(abc.symbol(x));
    }
    Ok(text)
}

/// Render `count` digits of `dsq`, starting at `start`, into `out[..count]`.
///
/// Both the digit span and the output buffer are bounds checked.
pub fn textize_n(
    abc: &Alphabet,
    dsq: &[u8],
    start: usize,
    count: usize,
    out: &mut [u8],
) -> Result<()> {
    let span = start
        .checked_add(count)
        .and_then(|end| dsq.get(start..end))
        .ok_or_else(|| {
            MsakitError::InvalidArgument(format!(
                "span {}+{} is outside a sequence of length {}",
                start,
                count,
                dsq.len()
            ))
        })?;
    if out.len() < count {
        return Err(MsakitError::InvalidArgument(format!(
            "output buffer holds {} bytes; {} needed",
            out.len(),
            count
        )));
    }

    for (i, &x) in span.iter().enumerate() {
        if !abc.is_valid(x) {
            return Err(MsakitError::InvalidSymbol {
                symbol: x,
                position: start + i,
            });
        }
        out[i] = abc.symbol(x);
    }
    Ok(())
}

/// Replace the contents of `dst` with a copy of `src`.
pub fn copy_into(src: &[u8], dst: &mut DigitalSequence) -> Result<()> {
    dst.dsq.clear();
    dst.dsq.try_reserve(src.len())?;
    dst.dsq.extend_from_slice(src);
    Ok(())
}

/// Append the digits for `text` to `seq`, mapping bytes through `inmap`.
///
/// Ignored bytes are skipped. On an illegal byte `seq` is truncated back to
/// its length before the call and the error names the byte and its position
/// within `text`. Returns the number of digits appended.
pub fn append(inmap: &[u8; 256], seq: &mut DigitalSequence, text: &[u8]) -> Result<usize> {
    map_onto(inmap, &mut seq.dsq, text)
}

/// Text-mode counterpart of [`append`].
///
/// `inmap` maps each input byte to the byte to store (or a sentinel).
pub fn append_text(inmap: &[u8; 256], seq: &mut Vec<u8>, text: &[u8]) -> Result<usize> {
    map_onto(inmap, seq, text)
}

fn map_onto(inmap: &[u8; 256], dest: &mut Vec<u8>, text: &[u8]) -> Result<usize> {
    let before = dest.len();
    dest.try_reserve(text.len())?;

    for (position, &c) in text.iter().enumerate() {
        match inmap[c as usize] {
            DSQ_IGNORED => continue,
            DSQ_ILLEGAL => {
                dest.truncate(before);
                return Err(MsakitError::InvalidSymbol {
                    symbol: c,
                    position,
                });
            }
            x => dest.push(x),
        }
    }
    Ok(dest.len() - before)
}

/// Count residues in `dsq`, skipping gaps and missing data.
pub fn residue_len(abc: &Alphabet, dsq: &[u8]) -> usize {
    dsq.iter().filter(|&&x| abc.is_residue(x)).count()
}

/// Remove every column of `target` that is a gap or missing in the digital
/// reference row `reference`.
///
/// `target` may be digits or text; only the reference is interpreted. Returns
/// the new length of `target`.
pub fn dealign(abc: &Alphabet, target: &mut Vec<u8>, reference: &[u8]) -> Result<usize> {
    dealign_by(target, reference, |x| abc.is_gap(x) || abc.is_missing(x))
}

/// Like [`dealign`], but `reference` is a text row read through the alphabet.
pub fn dealign_text(abc: &Alphabet, target: &mut Vec<u8>, reference: &[u8]) -> Result<usize> {
    dealign_by(target, reference, |c| {
        abc.is_gap_symbol(c) || abc.is_missing_symbol(c)
    })
}

fn dealign_by<F>(target: &mut Vec<u8>, reference: &[u8], drop_column: F) -> Result<usize>
where
    F: Fn(u8) -> bool,
{
    if target.len() != reference.len() {
        return Err(MsakitError::InvalidArgument(format!(
            "cannot dealign a row of length {} against a reference of length {}",
            target.len(),
            reference.len()
        )));
    }

    let mut kept = 0;
    for i in 0..reference.len() {
        if !drop_column(reference[i]) {
            target[kept] = target[i];
            kept += 1;
        }
    }
    target.truncate(kept);
    Ok(kept)
}
