//! Rewindable line streams.
//!
//! Parsers read their input a line at a time, but alphabet detection needs to
//! peek ahead and then put the stream back exactly where it was. The
//! [`LineSource`] trait captures the small contract both need: fetch the next
//! line, ask for and restore a byte offset, and hold a single savepoint
//! ("anchor") that pins an offset as restorable.
//!
//! [`LineBuffer`] is the in-memory implementation used throughout msakit.

use std::io::{self, Read};
use std::path::Path;

use crate::errors::{MsakitError, Result};
use crate::utils::get_dynamic_reader;

/// A line-oriented, seekable stream with a single savepoint slot.
pub trait LineSource {
    /// Current byte offset: the start of the line the next call to
    /// [`LineSource::next_line`] will return.
    fn offset(&self) -> u64;

    /// Move to a byte offset previously returned by [`LineSource::offset`].
    ///
    /// While an anchor is set, offsets before the anchor are rejected.
    fn set_offset(&mut self, offset: u64) -> Result<()>;

    /// Pin `offset` as restorable. Only one anchor may be outstanding.
    fn set_anchor(&mut self, offset: u64) -> Result<()>;

    /// Release the anchor set at `offset`.
    fn raise_anchor(&mut self, offset: u64) -> Result<()>;

    /// Replace the contents of `line` with the next line, without its
    /// terminator. Returns `Ok(false)` at end of stream.
    fn next_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool>;

    /// Name of the stream for diagnostics (usually a file path).
    fn name(&self) -> Option<&str>;
}

/// A fully buffered input stream.
///
/// The whole input is held in memory, so rewinding never touches the
/// underlying reader again.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    name: Option<String>,
    data: Vec<u8>,
    pos: usize,
    anchor: Option<usize>,
}

impl LineBuffer {
    pub fn from_bytes<B: Into<Vec<u8>>>(data: B) -> Self {
        LineBuffer {
            name: None,
            data: data.into(),
            pos: 0,
            anchor: None,
        }
    }

    /// Drain `reader` into a new buffer.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes(data))
    }

    /// Read a whole file, gunzipping it if the path ends in `.gz`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = get_dynamic_reader(path)?;
        let buffer = Self::from_reader(reader)?.with_name(path.display().to_string());
        log::debug!("buffered {} bytes from {}", buffer.len(), path.display());
        Ok(buffer)
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor.is_some()
    }
}

impl LineSource for LineBuffer {
    fn offset(&self) -> u64 {
        self.pos as u64
    }

    fn set_offset(&mut self, offset: u64) -> Result<()> {
        let offset = usize::try_from(offset)
            .ok()
            .filter(|&o| o <= self.data.len())
            .ok_or_else(|| {
                MsakitError::InvalidArgument(format!(
                    "offset {} is past the end of a {} byte stream",
                    offset,
                    self.data.len()
                ))
            })?;

        if let Some(anchor) = self.anchor {
            if offset < anchor {
                return Err(MsakitError::InvalidArgument(format!(
                    "offset {} is before the anchor at {}",
                    offset, anchor
                )));
            }
        }

        self.pos = offset;
        Ok(())
    }

    fn set_anchor(&mut self, offset: u64) -> Result<()> {
        if let Some(existing) = self.anchor {
            return Err(MsakitError::InvalidArgument(format!(
                "an anchor is already set at {}; only one savepoint may be outstanding",
                existing
            )));
        }
        let offset = usize::try_from(offset)
            .ok()
            .filter(|&o| o <= self.data.len())
            .ok_or_else(|| {
                MsakitError::InvalidArgument(format!("cannot anchor at offset {}", offset))
            })?;
        self.anchor = Some(offset);
        Ok(())
    }

    fn raise_anchor(&mut self, offset: u64) -> Result<()> {
        match self.anchor {
            Some(anchor) if anchor as u64 == offset => {
                self.anchor = None;
                Ok(())
            }
            Some(anchor) => Err(MsakitError::InvalidArgument(format!(
                "anchor is set at {}, not {}",
                anchor, offset
            ))),
            None => Err(MsakitError::InvalidArgument(format!(
                "no anchor is set (tried to raise {})",
                offset
            ))),
        }
    }

    fn next_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool> {
        line.clear();
        if self.pos >= self.data.len() {
            return Ok(false);
        }

        let rest = &self.data[self.pos..];
        let (content, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        let content = content.strip_suffix(b"\r").unwrap_or(content);

        line.extend_from_slice(content);
        self.pos += consumed;
        Ok(true)
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn all_lines(buf: &mut LineBuffer) -> Vec<String> {
        let mut line = Vec::new();
        let mut lines = Vec::new();
        while buf.next_line(&mut line).unwrap() {
            lines.push(String::from_utf8(line.clone()).unwrap());
        }
        lines
    }

    #[test]
    fn test_lines_strip_terminators() {
        let mut buf = LineBuffer::from_bytes("a\r\nbb\n\nccc");
        assert_eq!(all_lines(&mut buf), vec!["a", "bb", "", "ccc"]);
        assert!(buf.is_eof());
    }

    #[test]
    fn test_anchor_and_rewind() {
        let mut buf = LineBuffer::from_bytes("one\ntwo\nthree\n");
        let mut line = Vec::new();
        buf.next_line(&mut line).unwrap();

        let start = buf.offset();
        assert_eq!(start, 4);
        buf.set_anchor(start).unwrap();
        buf.next_line(&mut line).unwrap();
        buf.next_line(&mut line).unwrap();
        assert_eq!(line, b"three");

        buf.set_offset(start).unwrap();
        buf.raise_anchor(start).unwrap();
        assert!(!buf.has_anchor());

        buf.next_line(&mut line).unwrap();
        assert_eq!(line, b"two");
    }

    #[test]
    fn test_single_savepoint_slot() {
        let mut buf = LineBuffer::from_bytes("x\ny\n");
        buf.set_anchor(0).unwrap();
        let err = buf.set_anchor(2).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InvalidArgument);
        assert!(buf.raise_anchor(2).is_err());
        buf.raise_anchor(0).unwrap();
        assert!(buf.raise_anchor(0).is_err());
    }

    #[test]
    fn test_set_offset_respects_anchor_and_bounds() {
        let mut buf = LineBuffer::from_bytes("abc\ndef\n");
        buf.set_offset(4).unwrap();
        buf.set_anchor(4).unwrap();
        assert!(buf.set_offset(0).is_err());
        assert!(buf.set_offset(100).is_err());
        buf.set_offset(8).unwrap();
        buf.set_offset(4).unwrap();
        buf.raise_anchor(4).unwrap();
        buf.set_offset(0).unwrap();
    }

    #[test]
    fn test_empty_stream() {
        let mut buf = LineBuffer::from_bytes(Vec::new());
        let mut line = b"stale".to_vec();
        assert!(!buf.next_line(&mut line).unwrap());
        assert!(line.is_empty());
    }
}
