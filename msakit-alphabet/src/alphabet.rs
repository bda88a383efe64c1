use std::fmt::Display;
use std::str::FromStr;

use msakit_core::{MsakitError, Result};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Input map value for bytes that are not allowed in a sequence.
pub const DSQ_ILLEGAL: u8 = 255;
/// Input map value for bytes that are silently skipped (whitespace, usually).
pub const DSQ_IGNORED: u8 = 254;
/// Largest `Kp` an alphabet may have, so that digits never collide with the
/// two input map sentinels.
pub const MAX_KP: usize = 254;

/// Represents the type of alphabet used for digital sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlphabetType {
    /// RNA: ACGU canonical, IUPAC degeneracies
    Rna,
    /// DNA: ACGT canonical, IUPAC degeneracies
    Dna,
    /// Protein: 20 canonical amino acids, BJZOU degeneracies
    Amino,
    /// Caller-defined symbol set
    Custom,
}

impl Display for AlphabetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlphabetType::Rna => write!(f, "RNA"),
            AlphabetType::Dna => write!(f, "DNA"),
            AlphabetType::Amino => write!(f, "amino"),
            AlphabetType::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for AlphabetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rna" => Ok(AlphabetType::Rna),
            "dna" => Ok(AlphabetType::Dna),
            "amino" | "protein" => Ok(AlphabetType::Amino),
            "custom" => Ok(AlphabetType::Custom),
            _ => Err(format!("Invalid alphabet type: {}", s)),
        }
    }
}

// Internal digit order:
//   canonical   gap   degeneracies   unknown   missing
//    0..K-1      K     K+1..Kp-3      Kp-2      Kp-1
const DNA_SYMBOLS: &[u8] = b"ACGT-RYMKSWHBVDN~";
const RNA_SYMBOLS: &[u8] = b"ACGU-RYMKSWHBVDN~";
const AMINO_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY-BJZOUX~";

const DNA_DEGENERACIES: [(u8, &[u8]); 10] = [
    (b'R', b"AG"),
    (b'Y', b"CT"),
    (b'M', b"AC"),
    (b'K', b"GT"),
    (b'S', b"CG"),
    (b'W', b"AT"),
    (b'H', b"ACT"),
    (b'B', b"CGT"),
    (b'V', b"ACG"),
    (b'D', b"AGT"),
];

const RNA_DEGENERACIES: [(u8, &[u8]); 10] = [
    (b'R', b"AG"),
    (b'Y', b"CU"),
    (b'M', b"AC"),
    (b'K', b"GU"),
    (b'S', b"CG"),
    (b'W', b"AU"),
    (b'H', b"ACU"),
    (b'B', b"CGU"),
    (b'V', b"ACG"),
    (b'D', b"AGU"),
];

const AMINO_DEGENERACIES: [(u8, &[u8]); 5] = [
    (b'B', b"ND"),
    (b'J', b"IL"),
    (b'Z', b"QE"),
    (b'O', b"K"),
    (b'U', b"C"),
];

/// A closed mapping between sequence symbols and small integer digits.
///
/// Digits `0..K` are canonical residues, `K` is the gap, `K+1..Kp-2` are
/// degenerate codes, `Kp-2` is the unknown residue and `Kp-1` is missing
/// data. Once configured an alphabet is never mutated, so it can be shared
/// (usually behind an `Arc`) by any number of open files.
#[derive(Debug, Clone)]
pub struct Alphabet {
    alphabet_type: AlphabetType,
    k: usize,
    kp: usize,
    sym: Vec<u8>,
    inmap: [u8; 256],
    degen: Vec<Vec<bool>>, // [0..Kp-1][0..K-1]
    ndegen: Vec<usize>,
}

impl Alphabet {
    /// Create one of the standard biological alphabets.
    pub fn new(alphabet_type: AlphabetType) -> Result<Self> {
        match alphabet_type {
            AlphabetType::Dna => Self::dna(),
            AlphabetType::Rna => Self::rna(),
            AlphabetType::Amino => Self::amino(),
            AlphabetType::Custom => Err(MsakitError::InvalidArgument(
                "custom alphabets are created with Alphabet::custom()".to_string(),
            )),
        }
    }

    pub fn dna() -> Result<Self> {
        let mut a = Self::custom(DNA_SYMBOLS, 4, 17)?;
        a.alphabet_type = AlphabetType::Dna;
        a.set_equiv(b'T', b'U')?;
        a.set_equiv(b'N', b'X')?;
        a.set_nucleic_defaults(&DNA_DEGENERACIES)?;
        Ok(a)
    }

    pub fn rna() -> Result<Self> {
        let mut a = Self::custom(RNA_SYMBOLS, 4, 17)?;
        a.alphabet_type = AlphabetType::Rna;
        a.set_equiv(b'U', b'T')?;
        a.set_equiv(b'N', b'X')?;
        a.set_nucleic_defaults(&RNA_DEGENERACIES)?;
        Ok(a)
    }

    pub fn amino() -> Result<Self> {
        let mut a = Self::custom(AMINO_SYMBOLS, 20, 28)?;
        a.alphabet_type = AlphabetType::Amino;
        a.set_equiv(b'-', b'_')?;
        a.set_equiv(b'-', b'.')?;
        a.set_case_insensitive()?;
        for (c, ds) in AMINO_DEGENERACIES {
            a.set_degeneracy(c, ds)?;
        }
        Ok(a)
    }

    fn set_nucleic_defaults(&mut self, degeneracies: &[(u8, &[u8])]) -> Result<()> {
        self.set_equiv(b'-', b'_')?;
        self.set_equiv(b'-', b'.')?;
        self.set_case_insensitive()?;
        for &(c, ds) in degeneracies {
            self.set_degeneracy(c, ds)?;
        }
        Ok(())
    }

    /// Create an alphabet from a caller-supplied symbol string.
    ///
    /// `symbols` lists the display symbol of every digit, in internal order;
    /// it must be `kp` bytes long. Only the symbols themselves are legal input
    /// until further configuration; canonical residues are their own
    /// degeneracy sets and the unknown digit covers every canonical residue.
    ///
    /// # Arguments
    ///
    /// * `symbols` - display symbols, e.g. `b"ACGT-RYMKSWHBVDN~"`
    /// * `k` - number of canonical residues
    /// * `kp` - total number of digits
    pub fn custom(symbols: &[u8], k: usize, kp: usize) -> Result<Self> {
        if k == 0 {
            return Err(MsakitError::InvalidArgument(
                "an alphabet needs at least one canonical residue".to_string(),
            ));
        }
        if kp < k + 3 || kp > MAX_KP {
            return Err(MsakitError::InvalidArgument(format!(
                "Kp must be between K+3 ({}) and {} (gap, unknown and missing digits are required); got {}",
                k + 3,
                MAX_KP,
                kp
            )));
        }
        if symbols.len() != kp {
            return Err(MsakitError::InvalidArgument(format!(
                "symbol string has {} symbols; expected Kp = {}",
                symbols.len(),
                kp
            )));
        }

        let mut inmap = [DSQ_ILLEGAL; 256];
        for (x, &c) in symbols.iter().enumerate() {
            if !c.is_ascii_graphic() {
                return Err(MsakitError::InvalidArgument(format!(
                    "symbol #{} is not a printable ASCII character",
                    x
                )));
            }
            if inmap[c as usize] != DSQ_ILLEGAL {
                return Err(MsakitError::InvalidArgument(format!(
                    "symbol '{}' appears more than once",
                    c as char
                )));
            }
            inmap[c as usize] = x as u8;
        }

        let mut degen = vec![vec![false; k]; kp];
        let mut ndegen = vec![0; kp];
        for x in 0..k {
            degen[x][x] = true;
            ndegen[x] = 1;
        }
        degen[kp - 2].iter_mut().for_each(|d| *d = true);
        ndegen[kp - 2] = k;

        Ok(Alphabet {
            alphabet_type: AlphabetType::Custom,
            k,
            kp,
            sym: symbols.to_vec(),
            inmap,
            degen,
            ndegen,
        })
    }

    /// Map an additional input byte `c` to the digit of existing symbol `sym`.
    ///
    /// Display symbols cannot be remapped.
    pub fn set_equiv(&mut self, sym: u8, c: u8) -> Result<()> {
        if self.sym.contains(&c) {
            return Err(MsakitError::InvalidArgument(format!(
                "'{}' is already a symbol of the alphabet and cannot be made equivalent to '{}'",
                c as char, sym as char
            )));
        }
        let x = self
            .sym
            .iter()
            .position(|&s| s == sym)
            .ok_or_else(|| {
                MsakitError::InvalidArgument(format!(
                    "'{}' is not a symbol of the alphabet",
                    sym as char
                ))
            })?;
        self.inmap[c as usize] = x as u8;
        Ok(())
    }

    /// Make every configured letter mapping apply to both cases.
    pub fn set_case_insensitive(&mut self) -> Result<()> {
        for lc in b'a'..=b'z' {
            let uc = lc.to_ascii_uppercase();
            let (l, u) = (self.inmap[lc as usize], self.inmap[uc as usize]);
            match (self.is_valid(l), self.is_valid(u)) {
                (true, true) if l != u => {
                    return Err(MsakitError::InvalidArgument(format!(
                        "'{}' and '{}' map to different digits",
                        lc as char, uc as char
                    )));
                }
                (true, false) => self.inmap[uc as usize] = l,
                (false, true) => self.inmap[lc as usize] = u,
                _ => {}
            }
        }
        Ok(())
    }

    /// Define the canonical residues represented by degenerate symbol `c`.
    ///
    /// `c` must map to a degenerate digit (or the unknown digit); every byte of
    /// `ds` must map to a canonical residue.
    pub fn set_degeneracy(&mut self, c: u8, ds: &[u8]) -> Result<()> {
        let x = self.inmap[c as usize];
        if !(self.is_degenerate(x) || self.is_unknown(x)) {
            return Err(MsakitError::InvalidArgument(format!(
                "'{}' is not a degenerate symbol of the alphabet",
                c as char
            )));
        }

        let mut row = vec![false; self.k];
        for &d in ds {
            let y = self.inmap[d as usize];
            if !self.is_canonical(y) {
                return Err(MsakitError::InvalidArgument(format!(
                    "'{}' in the degeneracy of '{}' is not a canonical residue",
                    d as char, c as char
                )));
            }
            row[y as usize] = true;
        }

        self.ndegen[x as usize] = row.iter().filter(|&&b| b).count();
        self.degen[x as usize] = row;
        Ok(())
    }

    /// Silently skip each of `chars` on input.
    pub fn set_ignored(&mut self, chars: &[u8]) {
        for &c in chars {
            self.inmap[c as usize] = DSQ_IGNORED;
        }
    }

    pub fn alphabet_type(&self) -> AlphabetType {
        self.alphabet_type
    }

    /// Number of canonical residues.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Total number of digits.
    pub fn kp(&self) -> usize {
        self.kp
    }

    pub fn symbols(&self) -> &[u8] {
        &self.sym
    }

    /// Display symbol of digit `x`.
    ///
    /// # Panics
    ///
    /// If `x` is not a valid digit.
    pub fn symbol(&self, x: u8) -> u8 {
        self.sym[x as usize]
    }

    pub fn inmap(&self) -> &[u8; 256] {
        &self.inmap
    }

    /// Digit (or input map sentinel) for input byte `c`.
    pub fn digitize_symbol(&self, c: u8) -> u8 {
        self.inmap[c as usize]
    }

    /// Canonical membership of digit `x`, indexed `0..K`.
    pub fn degeneracy(&self, x: u8) -> &[bool] {
        &self.degen[x as usize]
    }

    pub fn ndegen(&self, x: u8) -> usize {
        self.ndegen[x as usize]
    }

    pub fn gap_digit(&self) -> u8 {
        self.k as u8
    }

    pub fn unknown_digit(&self) -> u8 {
        (self.kp - 2) as u8
    }

    pub fn missing_digit(&self) -> u8 {
        (self.kp - 1) as u8
    }

    pub fn gap_symbol(&self) -> u8 {
        self.sym[self.k]
    }

    pub fn is_valid(&self, x: u8) -> bool {
        (x as usize) < self.kp
    }

    /// Canonical, degenerate or unknown: anything but gap and missing data.
    pub fn is_residue(&self, x: u8) -> bool {
        self.is_canonical(x) || self.is_degenerate(x) || self.is_unknown(x)
    }

    pub fn is_canonical(&self, x: u8) -> bool {
        (x as usize) < self.k
    }

    pub fn is_gap(&self, x: u8) -> bool {
        x as usize == self.k
    }

    pub fn is_degenerate(&self, x: u8) -> bool {
        (x as usize) > self.k && (x as usize) < self.kp - 2
    }

    pub fn is_unknown(&self, x: u8) -> bool {
        x as usize == self.kp - 2
    }

    pub fn is_missing(&self, x: u8) -> bool {
        x as usize == self.kp - 1
    }

    pub fn is_valid_symbol(&self, c: u8) -> bool {
        self.is_valid(self.digitize_symbol(c))
    }

    pub fn is_residue_symbol(&self, c: u8) -> bool {
        self.is_residue(self.digitize_symbol(c))
    }

    pub fn is_canonical_symbol(&self, c: u8) -> bool {
        self.is_canonical(self.digitize_symbol(c))
    }

    pub fn is_gap_symbol(&self, c: u8) -> bool {
        self.is_gap(self.digitize_symbol(c))
    }

    pub fn is_degenerate_symbol(&self, c: u8) -> bool {
        self.is_degenerate(self.digitize_symbol(c))
    }

    pub fn is_unknown_symbol(&self, c: u8) -> bool {
        self.is_unknown(self.digitize_symbol(c))
    }

    pub fn is_missing_symbol(&self, c: u8) -> bool {
        self.is_missing(self.digitize_symbol(c))
    }

    /// Check that every byte of `seq` is legal input for this alphabet.
    ///
    /// Ignored bytes are allowed. The first offending byte is reported with its
    /// position in `seq`.
    pub fn validate_seq(&self, seq: &[u8]) -> Result<()> {
        for (position, &c) in seq.iter().enumerate() {
            let x = self.digitize_symbol(c);
            if x != DSQ_IGNORED && !self.is_valid(x) {
                return Err(MsakitError::InvalidSymbol {
                    symbol: c,
                    position,
                });
            }
        }
        Ok(())
    }

    /// Score of residue `x` given per-residue scores `sc[0..K]`.
    ///
    /// Degenerate and unknown residues get the mean score of the canonical
    /// residues they stand for. Gaps and missing data have no score; zero is
    /// returned for them.
    ///
    /// # Panics
    ///
    /// If `sc` has fewer than `K` slots. [`Alphabet::avg_score_vec`] checks
    /// its lengths instead.
    pub fn avg_score<T: Float>(&self, x: u8, sc: &[T]) -> T {
        if self.is_canonical(x) {
            return sc[x as usize];
        }
        if !self.is_residue(x) {
            return T::zero();
        }

        let (sum, n) = self.members(x).fold((T::zero(), T::zero()), |(sum, n), i| {
            (sum + sc[i], n + T::one())
        });
        if n == T::zero() { T::zero() } else { sum / n }
    }

    /// Expected score of residue `x` under residue frequencies `p[0..K]`.
    ///
    /// For a degenerate residue this is the `p`-weighted mean score of its
    /// canonical members. If the members all have zero probability the
    /// residue contributes zero. Gaps and missing data also give zero.
    ///
    /// # Panics
    ///
    /// If `sc` or `p` has fewer than `K` slots.
    pub fn expect_score<T: Float>(&self, x: u8, sc: &[T], p: &[T]) -> T {
        if self.is_canonical(x) {
            return sc[x as usize];
        }
        if !self.is_residue(x) {
            return T::zero();
        }

        let (num, denom) = self.members(x).fold((T::zero(), T::zero()), |(num, denom), i| {
            (num + sc[i] * p[i], denom + p[i])
        });
        if denom == T::zero() { T::zero() } else { num / denom }
    }

    /// Fill in `sc[K..Kp]` from the canonical scores in `sc[0..K]`.
    ///
    /// Gap and missing slots are set to zero.
    pub fn avg_score_vec<T: Float>(&self, sc: &mut [T]) -> Result<()> {
        self.check_vec_len(sc.len(), self.kp, "score vector")?;
        for x in (self.k + 1)..(self.kp - 1) {
            sc[x] = self.avg_score(x as u8, sc);
        }
        sc[self.k] = T::zero();
        sc[self.kp - 1] = T::zero();
        Ok(())
    }

    /// Fill in `sc[K..Kp]` with expected scores under frequencies `p[0..K]`.
    pub fn expect_score_vec<T: Float>(&self, sc: &mut [T], p: &[T]) -> Result<()> {
        self.check_vec_len(sc.len(), self.kp, "score vector")?;
        self.check_vec_len(p.len(), self.k, "probability vector")?;
        for x in (self.k + 1)..(self.kp - 1) {
            sc[x] = self.expect_score(x as u8, sc, p);
        }
        sc[self.k] = T::zero();
        sc[self.kp - 1] = T::zero();
        Ok(())
    }

    /// Probability that residues `x` and `y` are the same residue, given
    /// background frequencies `p[0..K]`.
    ///
    /// # Panics
    ///
    /// If either residue is degenerate and `p` has fewer than `K` slots.
    pub fn match_prob<T: Float>(&self, x: u8, y: u8, p: &[T]) -> T {
        if !self.is_residue(x) || !self.is_residue(y) {
            return T::zero();
        }
        if self.is_canonical(x) && self.is_canonical(y) {
            return if x == y { T::one() } else { T::zero() };
        }

        let (dx, dy) = (self.degeneracy(x), self.degeneracy(y));
        let mut both = T::zero();
        let mut sx = T::zero();
        let mut sy = T::zero();
        for i in 0..self.k {
            if dx[i] {
                sx = sx + p[i];
            }
            if dy[i] {
                sy = sy + p[i];
            }
            if dx[i] && dy[i] {
                both = both + p[i] * p[i];
            }
        }
        let denom = sx * sy;
        if denom == T::zero() { T::zero() } else { both / denom }
    }

    /// Add an observation of `x` with weight `wt` to canonical counts `ct[0..K]`.
    ///
    /// Degenerate residues split their weight evenly over their members. Gaps
    /// and missing data are not counted.
    pub fn count<T: Float>(&self, ct: &mut [T], x: u8, wt: T) -> Result<()> {
        self.check_vec_len(ct.len(), self.k, "count vector")?;
        if self.is_canonical(x) {
            ct[x as usize] = ct[x as usize] + wt;
        } else if self.is_residue(x) && self.ndegen(x) > 0 {
            let n = self.members(x).fold(T::zero(), |n, _| n + T::one());
            for i in 0..self.k {
                if self.degen[x as usize][i] {
                    ct[i] = ct[i] + wt / n;
                }
            }
        } else if !self.is_valid(x) {
            return Err(MsakitError::InvalidArgument(format!(
                "{} is not a digit of this alphabet",
                x
            )));
        }
        Ok(())
    }

    fn members(&self, x: u8) -> impl Iterator<Item = usize> + '_ {
        self.degen[x as usize]
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b)
            .map(|(i, _)| i)
    }

    fn check_vec_len(&self, len: usize, needed: usize, what: &str) -> Result<()> {
        if len < needed {
            return Err(MsakitError::InvalidArgument(format!(
                "{} has {} slots; need at least {}",
                what, len, needed
            )));
        }
        Ok(())
    }
}

const AA_ONLY_LETTERS: &[u8] = b"EFIJLOPQZ";
const NUCLEIC_CANONICAL_LETTERS: &[u8] = b"ACGTU";
const AMINO_CANONICAL_LETTERS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Guesses the alphabet type from counts of the letters `A..Z`.
///
/// `ct[0]` is the count of `A`, `ct[25]` of `Z`, case folded. Returns `None`
/// when the counts are too sparse or too ambiguous to decide.
///
/// # Rules
///
/// 1. 10 letters or fewer: undecided
/// 2. any letter that only occurs in proteins (`EFIJLOPQZ`): amino
/// 3. only `ACGTUN`, with at least one of `ACGTU`: DNA, or RNA if `U`
///    outnumbers `T`
/// 4. only the 20 amino acids plus `X`, at least one amino acid, and more than
///    2000 letters: amino
/// 5. otherwise undecided
pub fn guess_alphabet(ct: &[u64; 26]) -> Option<AlphabetType> {
    let count = |letters: &[u8]| -> u64 {
        letters.iter().map(|&c| ct[(c - b'A') as usize]).sum()
    };

    let n: u64 = ct.iter().sum();
    let n_aa_only = count(AA_ONLY_LETTERS);
    let n_nucleic = count(NUCLEIC_CANONICAL_LETTERS);
    let n_amino = count(AMINO_CANONICAL_LETTERS);
    let nn = ct[(b'N' - b'A') as usize];
    let nt = ct[(b'T' - b'A') as usize];
    let nu = ct[(b'U' - b'A') as usize];
    let nx = ct[(b'X' - b'A') as usize];

    if n <= 10 {
        None
    } else if n_aa_only > 0 {
        Some(AlphabetType::Amino)
    } else if n_nucleic > 0 && n_nucleic + nn == n {
        if nu > nt {
            Some(AlphabetType::Rna)
        } else {
            Some(AlphabetType::Dna)
        }
    } else if n_amino > 0 && n_amino + nx == n && n > 2000 {
        Some(AlphabetType::Amino)
    } else {
        None
    }
}

/// Tally the letters of `seq` into `ct`, case folded. Non-letters are skipped.
///
/// Returns the number of letters counted.
pub fn count_letters(seq: &[u8], ct: &mut [u64; 26]) -> u64 {
    let mut n = 0;
    for &c in seq {
        if c.is_ascii_alphabetic() {
            ct[(c.to_ascii_uppercase() - b'A') as usize] += 1;
            n += 1;
        }
    }
    n
}
