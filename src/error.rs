use thiserror::Error;

pub type DesignationResult<T> = Result<T, DesignationError>;

/// Failures surfaced by the lineage designation pipeline.
///
/// An empty candidate set is not represented here: a tree with no
/// supported clades is a legitimate outcome and yields an all-unassigned
/// table instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DesignationError {
    #[error("tree has no tips")]
    EmptyTree,

    #[error("malformed tree: {0}")]
    MalformedTree(String),

    #[error("tree carries no internal node support values")]
    MissingSupportData,

    #[error("no metadata row for sequence '{id}'")]
    MissingMetadataRow { id: String },

    #[error("no ancestral reconstruction for internal node {node} ({ancestral_id})")]
    MalformedAncestralIndex { node: usize, ancestral_id: String },

    #[error("sequence '{id}' has {found} alignment columns, expected {expected}")]
    AlignmentWidthMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("partition resolution did not stabilise after {rounds} rounds")]
    NonConvergentPartition { rounds: usize },

    #[error("lineage token alphabet exhausted ({capacity} tokens available)")]
    CapacityExceeded { capacity: usize },
}
