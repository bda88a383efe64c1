use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Coarse classification of a [`MsakitError`].
///
/// Callers that only need to decide how to report a failure ("bad residue
/// character" vs. "bad layout" vs. "disk problem") can match on this instead
/// of on the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Growing a sequence or alignment failed.
    Allocation,
    /// The underlying stream failed.
    Io,
    /// The input violated the layout rules of its format.
    StructuralMismatch,
    /// A byte could not be mapped to a symbol of the alphabet.
    InvalidSymbol,
    /// A caller passed an argument outside the allowed domain.
    InvalidArgument,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Allocation => write!(f, "allocation failure"),
            ErrorKind::Io => write!(f, "I/O failure"),
            ErrorKind::StructuralMismatch => write!(f, "structural mismatch"),
            ErrorKind::InvalidSymbol => write!(f, "invalid symbol"),
            ErrorKind::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

/// Everything a caller needs to report a failed alignment read.
///
/// `line` holds the raw bytes of the offending line (without its line
/// terminator). When the failure is detected at end of input, `line` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// 1-based; 0 if no line had been read yet.
    pub line_number: u64,
    pub line: Vec<u8>,
    pub source_name: Option<String>,
}

impl ParseFailure {
    pub fn line_len(&self) -> usize {
        self.line.len()
    }

    pub fn line_lossy(&self) -> String {
        String::from_utf8_lossy(&self.line).into_owned()
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse failed at line {} of {}: {}",
            self.line_number,
            self.source_name.as_deref().unwrap_or("<unnamed stream>"),
            self.message
        )?;
        if !self.line.is_empty() {
            write!(f, "\n  {}", self.line_lossy())?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum MsakitError {
    #[error("Allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(Box<ParseFailure>),

    #[error("Invalid symbol {} (byte {symbol:#04x}) at position {position}", display_byte(.symbol))]
    InvalidSymbol { symbol: u8, position: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl MsakitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MsakitError::Allocation(_) => ErrorKind::Allocation,
            MsakitError::Io(_) => ErrorKind::Io,
            MsakitError::Parse(failure) => failure.kind,
            MsakitError::InvalidSymbol { .. } => ErrorKind::InvalidSymbol,
            MsakitError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// The diagnostic bundle, if this error came out of a format parser.
    pub fn parse_failure(&self) -> Option<&ParseFailure> {
        match self {
            MsakitError::Parse(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<ParseFailure> for MsakitError {
    fn from(failure: ParseFailure) -> Self {
        MsakitError::Parse(Box::new(failure))
    }
}

fn display_byte(b: &u8) -> String {
    if b.is_ascii_graphic() {
        format!("'{}'", *b as char)
    } else {
        "<non-printing>".to_string()
    }
}

pub type Result<T> = std::result::Result<T, MsakitError>;
