use std::sync::Arc;

use msakit_alphabet::{Alphabet, DigitalSequence, append, append_text, digitize, textize};
use msakit_core::{MsakitError, Result};

use crate::consts::INITIAL_MSA_CAPACITY;

/// The aligned residues of one record: digits bound to the alignment's
/// alphabet, or raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Residues {
    Digital(DigitalSequence),
    Text(Vec<u8>),
}

impl Residues {
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Digits in digital mode, text bytes in text mode.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Residues::Digital(dsq) => dsq.as_slice(),
            Residues::Text(text) => text,
        }
    }

    pub fn is_digital(&self) -> bool {
        matches!(self, Residues::Digital(_))
    }

    /// Map `text` through `inmap` and append it. Returns how many symbols were
    /// stored; on failure nothing is appended.
    pub fn append_line(&mut self, inmap: &[u8; 256], text: &[u8]) -> Result<usize> {
        match self {
            Residues::Digital(dsq) => append(inmap, dsq, text),
            Residues::Text(seq) => append_text(inmap, seq, text),
        }
    }
}

/// One named row of an alignment.
///
/// Names and descriptions are UTF-8. Parsers decode them from the raw line
/// lossily, so a byte that is not valid UTF-8 becomes U+FFFD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsaRecord {
    name: String,
    accession: Option<String>,
    description: Option<String>,
    residues: Residues,
}

impl MsaRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accession(&self) -> Option<&str> {
        self.accession.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn residues(&self) -> &Residues {
        &self.residues
    }

    pub fn residues_mut(&mut self) -> &mut Residues {
        &mut self.residues
    }

    pub fn set_accession<S: Into<String>>(&mut self, accession: S) {
        self.accession = Some(accession.into());
    }

    pub fn set_description<S: Into<String>>(&mut self, description: S) {
        self.description = Some(description.into());
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// A multiple sequence alignment.
///
/// Records are kept in input order. In digital mode every record holds
/// digits of the shared alphabet; in text mode records hold raw bytes. A
/// completed alignment has every record, and the optional reference
/// annotation, exactly `alen` columns long.
#[derive(Debug, Clone)]
pub struct Msa {
    abc: Option<Arc<Alphabet>>,
    records: Vec<MsaRecord>,
    capacity: usize,
    alen: usize,
    reference: Option<Vec<u8>>,
}

impl Msa {
    /// Create an empty alignment, digital if `abc` is given.
    pub fn new(abc: Option<Arc<Alphabet>>) -> Result<Self> {
        Self::with_capacity(abc, INITIAL_MSA_CAPACITY)
    }

    pub fn with_capacity(abc: Option<Arc<Alphabet>>, capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut records = Vec::new();
        records.try_reserve_exact(capacity)?;
        Ok(Msa {
            abc,
            records,
            capacity,
            alen: 0,
            reference: None,
        })
    }

    pub fn alphabet(&self) -> Option<&Arc<Alphabet>> {
        self.abc.as_ref()
    }

    pub fn is_digital(&self) -> bool {
        self.abc.is_some()
    }

    /// Number of records.
    pub fn nseq(&self) -> usize {
        self.records.len()
    }

    /// Number of columns.
    pub fn alen(&self) -> usize {
        self.alen
    }

    /// Record slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn records(&self) -> &[MsaRecord] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> Option<&MsaRecord> {
        self.records.get(idx)
    }

    pub fn record_mut(&mut self, idx: usize) -> Option<&mut MsaRecord> {
        self.records.get_mut(idx)
    }

    /// Reference (consensus) annotation, one byte per column.
    pub fn reference(&self) -> Option<&[u8]> {
        self.reference.as_deref()
    }

    /// Double the number of record slots. Existing records are untouched.
    pub fn expand(&mut self) -> Result<()> {
        // an overflowing size saturates, and the reservation then fails
        let new_capacity = self.capacity.saturating_mul(2);
        self.records
            .try_reserve_exact(new_capacity.saturating_sub(self.records.len()))?;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Add an empty record and return its index.
    pub fn push_record(&mut self, name: &str) -> Result<usize> {
        if name.is_empty() {
            return Err(MsakitError::InvalidArgument(
                "alignment records need a name".to_string(),
            ));
        }
        let residues = self.empty_residues();
        self.push_parsed(name.to_string(), None, residues)
    }

    /// Empty residue storage in this alignment's mode.
    pub(crate) fn empty_residues(&self) -> Residues {
        match self.abc {
            Some(_) => Residues::Digital(DigitalSequence::new()),
            None => Residues::Text(Vec::new()),
        }
    }

    pub(crate) fn push_parsed(
        &mut self,
        name: String,
        description: Option<String>,
        residues: Residues,
    ) -> Result<usize> {
        if self.records.len() >= self.capacity {
            self.expand()?;
        }
        self.records.push(MsaRecord {
            name,
            accession: None,
            description,
            residues,
        });
        Ok(self.records.len() - 1)
    }

    /// Add a complete record from its aligned text.
    ///
    /// In digital mode `text` is digitized with the alignment's alphabet. The
    /// first record fixes `alen`; later records must match it.
    pub fn push_sequence(&mut self, name: &str, text: &[u8]) -> Result<usize> {
        let residues = match &self.abc {
            Some(abc) => Residues::Digital(digitize(abc, text)?),
            None => Residues::Text(text.to_vec()),
        };
        if !self.records.is_empty() && residues.len() != self.alen {
            return Err(MsakitError::InvalidArgument(format!(
                "sequence {} has alen {}; expected {}",
                name,
                residues.len(),
                self.alen
            )));
        }

        let idx = self.push_record(name)?;
        self.alen = residues.len();
        self.records[idx].residues = residues;
        Ok(idx)
    }

    /// Set the reference annotation; it must span every column.
    pub fn set_reference(&mut self, reference: Vec<u8>) -> Result<()> {
        if reference.len() != self.alen {
            return Err(MsakitError::InvalidArgument(format!(
                "reference annotation has {} columns; alignment has {}",
                reference.len(),
                self.alen
            )));
        }
        self.reference = Some(reference);
        Ok(())
    }

    pub fn clear_reference(&mut self) {
        self.reference = None;
    }

    pub(crate) fn set_alen(&mut self, alen: usize) {
        self.alen = alen;
    }

    pub(crate) fn set_reference_unchecked(&mut self, reference: Vec<u8>) {
        self.reference = Some(reference);
    }

    /// Check that every record and the reference span exactly `alen` columns.
    pub fn validate(&self) -> Result<()> {
        for record in &self.records {
            if record.len() != self.alen {
                return Err(MsakitError::InvalidArgument(format!(
                    "sequence {} has alen {}; expected {}",
                    record.name,
                    record.len(),
                    self.alen
                )));
            }
        }
        if let Some(reference) = &self.reference {
            if reference.len() != self.alen {
                return Err(MsakitError::InvalidArgument(format!(
                    "reference annotation has {} columns; alignment has {}",
                    reference.len(),
                    self.alen
                )));
            }
        }
        Ok(())
    }

    /// Convert a text-mode alignment to digital mode.
    ///
    /// Either every record converts or the alignment is left unchanged.
    pub fn digitize(&mut self, abc: Arc<Alphabet>) -> Result<()> {
        if self.abc.is_some() {
            return Err(MsakitError::InvalidArgument(
                "alignment is already digital".to_string(),
            ));
        }

        let mut converted = Vec::new();
        converted.try_reserve_exact(self.records.len())?;
        for record in &self.records {
            let dsq = digitize(&abc, record.residues.as_bytes())?;
            if dsq.len() != record.len() {
                return Err(MsakitError::InvalidArgument(format!(
                    "sequence {} changes length when digitized",
                    record.name
                )));
            }
            converted.push(Residues::Digital(dsq));
        }

        for (record, residues) in self.records.iter_mut().zip(converted) {
            record.residues = residues;
        }
        self.abc = Some(abc);
        Ok(())
    }

    /// Convert a digital alignment back to text mode.
    pub fn textize(&mut self) -> Result<()> {
        let abc = self.abc.take().ok_or_else(|| {
            MsakitError::InvalidArgument("alignment is already in text mode".to_string())
        })?;

        let mut converted = Vec::new();
        converted.try_reserve_exact(self.records.len())?;
        for record in &self.records {
            match textize(&abc, record.residues.as_bytes()) {
                Ok(text) => converted.push(Residues::Text(text)),
                Err(e) => {
                    self.abc = Some(abc);
                    return Err(e);
                }
            }
        }

        for (record, residues) in self.records.iter_mut().zip(converted) {
            record.residues = residues;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_growth_preserves_records() {
        let mut msa = Msa::new(None).unwrap();
        assert_eq!(msa.capacity(), INITIAL_MSA_CAPACITY);

        for i in 0..40 {
            let text = format!("AC{:02}", i);
            msa.push_sequence(&format!("seq{}", i), text.as_bytes())
                .unwrap();
        }
        assert_eq!(msa.nseq(), 40);
        assert_eq!(msa.capacity(), 64);
        for i in 0..40 {
            let record = msa.record(i).unwrap();
            assert_eq!(record.name(), format!("seq{}", i));
            assert_eq!(record.residues().as_bytes(), format!("AC{:02}", i).as_bytes());
        }
    }

    #[test]
    fn test_capacity_overflow_is_an_allocation_failure() {
        let mut msa = Msa::new(None).unwrap();
        msa.push_sequence("a", b"ACGT").unwrap();
        msa.capacity = usize::MAX / 2 + 1;

        let err = msa.expand().unwrap_err();
        assert_eq!(err.kind(), msakit_core::ErrorKind::Allocation);
        assert_eq!(msa.capacity(), usize::MAX / 2 + 1);
        assert_eq!(msa.nseq(), 1);
    }

    #[test]
    fn test_push_sequence_checks_alen() {
        let mut msa = Msa::new(None).unwrap();
        msa.push_sequence("a", b"ACGT").unwrap();
        assert!(msa.push_sequence("b", b"ACG").is_err());
        assert_eq!(msa.nseq(), 1);
        assert!(msa.push_record("").is_err());
    }

    #[test]
    fn test_reference_must_span_alignment() {
        let mut msa = Msa::new(None).unwrap();
        msa.push_sequence("a", b"ACGT").unwrap();
        assert!(msa.set_reference(b"XX.".to_vec()).is_err());
        msa.set_reference(b"XX.X".to_vec()).unwrap();
        assert_eq!(msa.reference(), Some(b"XX.X".as_slice()));
        msa.validate().unwrap();
    }

    #[test]
    fn test_digitize_and_textize() {
        let dna = Arc::new(Alphabet::dna().unwrap());
        let mut msa = Msa::new(None).unwrap();
        msa.push_sequence("a", b"acg-t").unwrap();
        msa.push_sequence("b", b"AC.NT").unwrap();

        msa.digitize(dna.clone()).unwrap();
        assert!(msa.is_digital());
        assert_eq!(msa.record(1).unwrap().residues().as_bytes(), &[0, 1, 4, 15, 3]);
        assert!(msa.digitize(dna).is_err());

        msa.textize().unwrap();
        assert!(!msa.is_digital());
        assert_eq!(msa.record(0).unwrap().residues().as_bytes(), b"ACG-T");
        assert_eq!(msa.record(1).unwrap().residues().as_bytes(), b"AC-NT");
    }

    #[test]
    fn test_failed_digitize_leaves_text() {
        let dna = Arc::new(Alphabet::dna().unwrap());
        let mut msa = Msa::new(None).unwrap();
        msa.push_sequence("a", b"ACGT").unwrap();
        msa.push_sequence("b", b"ACJT").unwrap();
        assert!(msa.digitize(dna).is_err());
        assert!(!msa.is_digital());
        assert_eq!(msa.record(0).unwrap().residues().as_bytes(), b"ACGT");
    }

    #[test]
    fn test_digital_push_record_appends_lines() {
        let dna = Arc::new(Alphabet::dna().unwrap());
        let mut msa = Msa::new(Some(dna.clone())).unwrap();
        let idx = msa.push_record("x").unwrap();
        let record = msa.record_mut(idx).unwrap();
        record.set_description("first one");
        record
            .residues_mut()
            .append_line(dna.inmap(), b"ACGT")
            .unwrap();
        assert!(record.residues().is_digital());
        assert_eq!(record.len(), 4);
        assert_eq!(record.description(), Some("first one"));
    }
}
