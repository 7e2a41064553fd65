use crate::lineage::types::DEFAULT_TOKEN_CAPACITY;
use serde::{Deserialize, Serialize};

/// Thresholds for the designation pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignationParams {
    /// Internal nodes need support strictly above this value.
    #[serde(default = "default_min_support")]
    pub min_support: f64,
    /// Support equal to this value always qualifies.
    #[serde(default = "default_max_support")]
    pub max_support: f64,
    #[serde(default = "default_min_cluster_tips")]
    pub min_cluster_tips: usize,
    /// Minimum informative fraction of a sequence's aligned length.
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,
    /// Minimum tips a cluster must claim for itself after nesting.
    #[serde(default = "default_min_assigned")]
    pub min_assigned: usize,
    /// Minimum tip-count gap between a cluster and its enclosing cluster.
    #[serde(default = "default_min_parent_gap")]
    pub min_parent_gap: usize,
    /// Dot levels allowed under one root token before a fresh token is used.
    #[serde(default = "default_max_dot_depth")]
    pub max_dot_depth: usize,
    #[serde(default = "default_token_capacity")]
    pub token_capacity: usize,
    /// Upper bound on partition rounds; 0 derives it from the candidate count.
    #[serde(default)]
    pub max_partition_rounds: usize,
}

fn default_min_support() -> f64 {
    70.0
}

fn default_max_support() -> f64 {
    100.0
}

fn default_min_cluster_tips() -> usize {
    5
}

fn default_coverage_threshold() -> f64 {
    0.95
}

fn default_min_assigned() -> usize {
    2
}

fn default_min_parent_gap() -> usize {
    5
}

fn default_max_dot_depth() -> usize {
    4
}

fn default_token_capacity() -> usize {
    DEFAULT_TOKEN_CAPACITY
}

impl Default for DesignationParams {
    fn default() -> Self {
        Self {
            min_support: default_min_support(),
            max_support: default_max_support(),
            min_cluster_tips: default_min_cluster_tips(),
            coverage_threshold: default_coverage_threshold(),
            min_assigned: default_min_assigned(),
            min_parent_gap: default_min_parent_gap(),
            max_dot_depth: default_max_dot_depth(),
            token_capacity: default_token_capacity(),
            max_partition_rounds: 0,
        }
    }
}

impl DesignationParams {
    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    pub fn with_min_cluster_tips(mut self, min_cluster_tips: usize) -> Self {
        self.min_cluster_tips = min_cluster_tips;
        self
    }

    pub fn with_coverage_threshold(mut self, coverage_threshold: f64) -> Self {
        self.coverage_threshold = coverage_threshold;
        self
    }

    pub fn with_max_dot_depth(mut self, max_dot_depth: usize) -> Self {
        self.max_dot_depth = max_dot_depth;
        self
    }

    pub fn with_token_capacity(mut self, token_capacity: usize) -> Self {
        self.token_capacity = token_capacity;
        self
    }

    pub(crate) fn qualifies(&self, support: f64) -> bool {
        support > self.min_support || support == self.max_support
    }
}
