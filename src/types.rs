use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-sequence base composition used by the coverage filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceStats {
    pub raw_length: usize,
    pub n_count: usize,
    pub gap_count: usize,
}

impl SequenceStats {
    pub fn from_bases(bases: &[u8]) -> Self {
        let mut stats = SequenceStats {
            raw_length: bases.len(),
            ..Default::default()
        };
        for base in bases {
            match base {
                b'N' | b'n' => stats.n_count += 1,
                b'-' => stats.gap_count += 1,
                _ => {}
            }
        }
        stats
    }

    pub fn post_filter_length(&self) -> usize {
        self.raw_length - self.n_count - self.gap_count
    }

    /// A sequence passes when its informative length reaches `threshold`
    /// of the aligned length.
    pub fn passes_coverage(&self, threshold: f64) -> bool {
        self.post_filter_length() as f64 >= threshold * self.raw_length as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSequence {
    pub id: String,
    pub bases: Vec<u8>,
}

/// Observed sequences keyed by tip label, in input order.
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    records: Vec<AlignedSequence>,
    index: HashMap<String, usize>,
}

impl Alignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the sequence stored under `id`.
    pub fn insert(&mut self, id: impl Into<String>, bases: impl Into<Vec<u8>>) {
        let id = id.into();
        let bases = bases.into();
        match self.index.get(&id) {
            Some(&idx) => self.records[idx].bases = bases,
            None => {
                self.index.insert(id.clone(), self.records.len());
                self.records.push(AlignedSequence { id, bases });
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&[u8]> {
        self.index
            .get(id)
            .map(|&idx| self.records[idx].bases.as_slice())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlignedSequence> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<S: Into<String>, B: Into<Vec<u8>>> FromIterator<(S, B)> for Alignment {
    fn from_iter<I: IntoIterator<Item = (S, B)>>(iter: I) -> Self {
        let mut alignment = Alignment::new();
        for (id, bases) in iter {
            alignment.insert(id, bases);
        }
        alignment
    }
}

/// Reconstructed sequences keyed by `NODE_<7-digit>` identifiers.
#[derive(Debug, Clone, Default)]
pub struct AncestralStates {
    states: HashMap<String, Vec<u8>>,
}

impl AncestralStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_id: impl Into<String>, bases: impl Into<Vec<u8>>) {
        self.states.insert(node_id.into(), bases.into());
    }

    pub fn get(&self, node_id: &str) -> Option<&[u8]> {
        self.states.get(node_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl<S: Into<String>, B: Into<Vec<u8>>> FromIterator<(S, B)> for AncestralStates {
    fn from_iter<I: IntoIterator<Item = (S, B)>>(iter: I) -> Self {
        let mut states = AncestralStates::new();
        for (id, bases) in iter {
            states.insert(id, bases);
        }
        states
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub year: Option<i32>,
    pub country: Option<String>,
    pub assignment: Option<String>,
}

impl MetadataRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_assignment(mut self, assignment: impl Into<String>) -> Self {
        self.assignment = Some(assignment.into());
        self
    }
}

/// Metadata table keyed by sequence id. Row order is the output order.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    records: Vec<MetadataRecord>,
    index: HashMap<String, usize>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: MetadataRecord) {
        match self.index.get(&record.id) {
            Some(&idx) => self.records[idx] = record,
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&MetadataRecord> {
        self.index.get(id).map(|&idx| &self.records[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<MetadataRecord> for Metadata {
    fn from_iter<I: IntoIterator<Item = MetadataRecord>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for record in iter {
            metadata.insert(record);
        }
        metadata
    }
}

/// One row of the output sequence table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRow {
    pub id: String,
    pub n_count: Option<usize>,
    pub gap_count: Option<usize>,
    pub length: Option<usize>,
    pub year: Option<i32>,
    pub country: Option<String>,
    pub lineage: Option<String>,
    pub previous_assignment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_stats() {
        let stats = SequenceStats::from_bases(b"ACGTNN--ac");
        assert_eq!(stats.raw_length, 10);
        assert_eq!(stats.n_count, 2);
        assert_eq!(stats.gap_count, 2);
        assert_eq!(stats.post_filter_length(), 6);
        assert!(!stats.passes_coverage(0.95));
        assert!(stats.passes_coverage(0.6));
    }

    #[test]
    fn test_coverage_boundary() {
        // 19 of 20 informative is exactly 95%
        let mut bases = vec![b'A'; 19];
        bases.push(b'N');
        assert!(SequenceStats::from_bases(&bases).passes_coverage(0.95));
        bases[0] = b'-';
        assert!(!SequenceStats::from_bases(&bases).passes_coverage(0.95));
    }

    #[test]
    fn test_alignment_replaces_duplicates() {
        let mut alignment = Alignment::new();
        alignment.insert("a", b"AC".to_vec());
        alignment.insert("b", b"GG".to_vec());
        alignment.insert("a", b"TT".to_vec());
        assert_eq!(alignment.len(), 2);
        assert_eq!(alignment.get("a"), Some(&b"TT"[..]));
        assert_eq!(alignment.iter().next().map(|r| r.id.as_str()), Some("a"));
    }
}
