//! # Digital biosequence alphabets
//!
//! An [`Alphabet`] maps sequence symbols onto a small closed range of digits:
//!
//! ```text
//!   canonical   gap   degeneracies   unknown   missing
//!    0..K-1      K     K+1..Kp-3      Kp-2      Kp-1
//! ```
//!
//! Sequences are stored as [`DigitalSequence`]s of those digits; the functions
//! in [`digital`] convert between text and digits. [`guess_alphabet`] is the
//! pure letter-frequency classifier behind stream-level alphabet detection.
//!
//! ```
//! use msakit_alphabet::{Alphabet, digitize, textize};
//!
//! let dna = Alphabet::dna().unwrap();
//! let seq = digitize(&dna, "acgu-n").unwrap();
//! assert_eq!(textize(&dna, seq.as_slice()).unwrap(), b"ACGT-N");
//! ```

pub mod alphabet;
pub mod digital;

pub use alphabet::{
    Alphabet, AlphabetType, DSQ_IGNORED, DSQ_ILLEGAL, MAX_KP, count_letters, guess_alphabet,
};
pub use digital::{
    DigitalSequence, append, append_text, copy_into, dealign, dealign_text, digitize, residue_len,
    textize, textize_n,
};
