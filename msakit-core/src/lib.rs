//! # Core types shared by the msakit crates.
//!
//! This small crate holds the error taxonomy used by every msakit parser, and the
//! rewindable line streams that the alignment readers are written against.
//!
pub mod buffer;
pub mod errors;
pub mod utils;

// re-expose core types
pub use buffer::{LineBuffer, LineSource};
pub use errors::{ErrorKind, MsakitError, ParseFailure, Result};
