//! # Multiple sequence alignment input/output.
//!
//! This crate reads and writes multiple sequence alignments in aligned FASTA
//! and PSI-BLAST formats, either as raw text or digitized against an
//! [`Alphabet`](msakit_alphabet::Alphabet). An [`MsaFile`] session wraps one
//! input stream; it can guess the alphabet of what it is about to read
//! without consuming anything, and reports malformed input with the line
//! number and contents of the offending line.
//!
//! ```
//! use msakit_core::LineBuffer;
//! use msakit_io::{MsaFile, MsaFormat};
//!
//! let input = ">seq1\nACGT\n>seq2\nAC-T\n";
//! let mut file = MsaFile::new(LineBuffer::from_bytes(input), MsaFormat::Afa, None);
//! file.guess_and_set_digital().unwrap();
//! let msa = file.read().unwrap().unwrap();
//! assert_eq!(msa.nseq(), 2);
//! assert_eq!(msa.alen(), 4);
//! ```
//!
mod afa;
pub mod consts;
pub mod format;
pub mod guess;
pub mod msa;
pub mod msafile;
mod psiblast;

// re-expose core functions
pub use consts::*;
pub use format::{MsaFormat, WriteOptions};
pub use guess::{ResidueField, guess_stream_alphabet};
pub use msa::{Msa, MsaRecord, Residues};
pub use msafile::{MsaFile, read_msa_file, write_msa_file};
