use crate::error::{DesignationError, DesignationResult};
use crate::lineage::tree::NodeId;
use crate::lineage::types::{Candidate, PruneReason};
use crate::lineage::WorkingSet;
use crate::types::SequenceStats;
use std::collections::HashMap;
use tracing::debug;

/// Seed the working set with every supported internal node that has at
/// least `min_cluster_tips` descendant tips.
pub(crate) fn detect(work: &mut WorkingSet<'_>) -> DesignationResult<()> {
    let tree = work.tree;
    let params = work.params;
    if !tree.has_support() {
        return Err(DesignationError::MissingSupportData);
    }

    work.candidates = tree
        .internal_nodes()
        .filter(|&node| {
            tree.support(node)
                .is_some_and(|support| params.qualifies(support))
        })
        .map(|node| Candidate::new(node, tree.tip_count(node)))
        .filter(|c| c.tip_count >= params.min_cluster_tips)
        .collect();

    debug!(
        candidates = work.candidates.len(),
        min_support = params.min_support,
        "detected supported clades"
    );
    Ok(())
}

/// Tips whose informative length falls below the coverage threshold.
/// Tips without an aligned sequence are not counted as failing.
pub(crate) fn low_coverage_tips(work: &WorkingSet<'_>) -> Vec<NodeId> {
    work.tree
        .tip_labels()
        .iter()
        .enumerate()
        .filter(|(_, label)| {
            work.alignment
                .get(label)
                .map(SequenceStats::from_bases)
                .is_some_and(|stats| !stats.passes_coverage(work.params.coverage_threshold))
        })
        .map(|(tip, _)| tip)
        .collect()
}

/// Discount low-coverage tips from every candidate containing them and
/// drop candidates that fall under the minimum size.
pub(crate) fn correct_coverage(work: &mut WorkingSet<'_>) {
    let failing = low_coverage_tips(work);
    if failing.is_empty() {
        return;
    }

    let mut tally: HashMap<NodeId, usize> = HashMap::new();
    for &tip in &failing {
        for ancestor in work.tree.ancestors(tip) {
            if ancestor != tip {
                *tally.entry(ancestor).or_insert(0) += 1;
            }
        }
    }

    let min_tips = work.params.min_cluster_tips;
    let mut kept = Vec::with_capacity(work.candidates.len());
    for mut candidate in std::mem::take(&mut work.candidates) {
        if let Some(&count) = tally.get(&candidate.node) {
            candidate.tip_count = candidate.tip_count.saturating_sub(count);
        }
        if candidate.tip_count >= min_tips {
            kept.push(candidate);
        } else {
            work.record_prune(
                candidate.node,
                PruneReason::LowCoverage {
                    tip_count: candidate.tip_count,
                },
            );
        }
    }
    work.candidates = kept;

    debug!(
        failing_tips = failing.len(),
        candidates = work.candidates.len(),
        "applied coverage correction"
    );
}
