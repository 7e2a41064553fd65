use crate::lineage::{Designation, Lineage, Outcome, PrunedCandidate};
use crate::types::SequenceRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct LineageExport {
    pub outcome: Outcome,
    pub summary: DesignationSummary,
    pub lineages: Vec<Lineage>,
    pub pruned: Vec<PrunedCandidate>,
    pub sequences: Vec<SequenceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignationSummary {
    pub lineage_count: usize,
    pub sequence_count: usize,
    pub assigned_sequences: usize,
    pub unassigned_sequences: usize,
    pub pruned_candidates: usize,
}

impl LineageExport {
    pub fn from_designation(designation: &Designation) -> Self {
        let assigned = designation
            .rows
            .iter()
            .filter(|row| row.lineage.is_some())
            .count();
        Self {
            outcome: designation.outcome,
            summary: DesignationSummary {
                lineage_count: designation.lineages.len(),
                sequence_count: designation.rows.len(),
                assigned_sequences: assigned,
                unassigned_sequences: designation.rows.len() - assigned,
                pruned_candidates: designation.pruned.len(),
            },
            lineages: designation.lineages.clone(),
            pruned: designation.pruned.clone(),
            sequences: designation.rows.clone(),
        }
    }
}
