use crate::lineage::tree::NodeId;
use crate::types::SequenceRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A clade under consideration as a lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub node: NodeId,
    /// Descendant tips before coverage correction.
    pub raw_tip_count: usize,
    /// Descendant tips minus low-coverage tips.
    pub tip_count: usize,
    /// Alignment columns where every descendant tip departs from the node's
    /// reconstructed state.
    pub shared_differences: usize,
    /// Number of other candidates nested inside this one.
    pub overlap: usize,
}

impl Candidate {
    pub fn new(node: NodeId, tip_count: usize) -> Self {
        Self {
            node,
            raw_tip_count: tip_count,
            tip_count,
            shared_differences: 0,
            overlap: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PruneReason {
    /// Fewer trusted tips than the minimum once low-coverage tips are discounted.
    LowCoverage { tip_count: usize },
    /// No column is uniformly derived across the clade.
    NoSharedDifferences,
    /// Nested candidates claimed nearly all of this clade's tips.
    TooFewAssigned { assigned: usize },
    /// Tip count too close to the enclosing candidate.
    TooCloseToParent { parent: String, gap: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrunedCandidate {
    pub node: NodeId,
    pub ancestral_id: String,
    #[serde(flatten)]
    pub reason: PruneReason,
}

/// A candidate that survived partition resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// 1-based, ordered by descending overlap.
    pub index: usize,
    pub node: NodeId,
    pub tip_count: usize,
    pub shared_differences: usize,
    pub overlap: usize,
    /// Position in the cluster list of the nearest enclosing cluster.
    pub parent: Option<usize>,
    /// Tips assigned to this cluster rather than a nested one.
    pub members: Vec<NodeId>,
}

/// Number of distinct root tokens expressible with one or two letters.
pub const DEFAULT_TOKEN_CAPACITY: usize = 26 + 26 * 26;

/// Render a root token index as letters: 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn token_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Structured lineage name: optional previous-assignment prefix, a root
/// token and one integer per nesting level below that token.
///
/// Renders as `<prefix>_<letters>1.<n>.<n>...`, e.g. `A1`, `A1.2.1`,
/// `DENV2_B1.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineageLabel {
    pub prefix: Option<String>,
    pub token: usize,
    pub path: Vec<u32>,
}

impl LineageLabel {
    pub fn root(prefix: Option<String>, token: usize) -> Self {
        Self {
            prefix,
            token,
            path: Vec::new(),
        }
    }

    pub fn child(&self, ordinal: u32) -> Self {
        let mut path = self.path.clone();
        path.push(ordinal);
        Self {
            prefix: self.prefix.clone(),
            token: self.token,
            path,
        }
    }

    /// Dot levels below the root token.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn root_token(&self) -> String {
        format!("{}1", token_letters(self.token))
    }
}

impl fmt::Display for LineageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{}_", prefix)?;
        }
        write!(f, "{}", self.root_token())?;
        for level in &self.path {
            write!(f, ".{}", level)?;
        }
        Ok(())
    }
}

/// A named cluster as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub label: String,
    pub node: NodeId,
    pub ancestral_id: String,
    pub parent: Option<String>,
    pub tip_count: usize,
    pub assigned: usize,
    pub shared_differences: usize,
    /// Every previous-assignment label found among the clade's tips, kept
    /// even when a mixed clade is renamed with a fallback token.
    pub previous_labels: Vec<String>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub countries: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Designated,
    /// No clade met the thresholds; every sequence is unassigned.
    NoCandidates,
}

#[derive(Debug, Clone)]
pub struct Designation {
    pub outcome: Outcome,
    pub rows: Vec<SequenceRow>,
    pub lineages: Vec<Lineage>,
    pub pruned: Vec<PrunedCandidate>,
}

impl Designation {
    pub fn lineage_of(&self, id: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.id == id)
            .and_then(|row| row.lineage.as_deref())
    }
}
