use crate::error::{DesignationError, DesignationResult};
use crate::lineage::types::PruneReason;
use crate::lineage::WorkingSet;
use tracing::debug;

fn differs(observed: u8, ancestral: u8) -> bool {
    !observed.eq_ignore_ascii_case(&ancestral)
}

/// Count the columns at which every aligned descendant of `node` departs
/// from the node's reconstructed state.
///
/// The shared set starts as the first tip's differences and is narrowed by
/// each following tip. Tips missing from the alignment are skipped; a clade
/// with no aligned tips has no shared differences.
pub(crate) fn shared_differences(work: &WorkingSet<'_>, node: usize) -> DesignationResult<usize> {
    let tree = work.tree;
    let ancestral_id = tree
        .ancestral_id(node)
        .ok_or_else(|| DesignationError::MalformedAncestralIndex {
            node,
            ancestral_id: String::new(),
        })?;
    let ancestral = work
        .ancestral
        .get(&ancestral_id)
        .ok_or_else(|| DesignationError::MalformedAncestralIndex {
            node,
            ancestral_id: ancestral_id.clone(),
        })?;

    let mut shared: Option<Vec<usize>> = None;
    for &tip in tree.descendant_tips(node) {
        let Some(observed) = tree
            .tip_label(tip)
            .and_then(|label| work.alignment.get(label))
        else {
            continue;
        };
        if observed.len() != ancestral.len() {
            return Err(DesignationError::AlignmentWidthMismatch {
                id: ancestral_id,
                expected: observed.len(),
                found: ancestral.len(),
            });
        }

        match shared.as_mut() {
            None => {
                shared = Some(
                    (0..ancestral.len())
                        .filter(|&col| differs(observed[col], ancestral[col]))
                        .collect(),
                );
            }
            Some(columns) => columns.retain(|&col| differs(observed[col], ancestral[col])),
        }

        if shared.as_ref().is_some_and(|columns| columns.is_empty()) {
            break;
        }
    }

    Ok(shared.map_or(0, |columns| columns.len()))
}

/// Drop candidates whose tips share no derived column.
pub(crate) fn filter(work: &mut WorkingSet<'_>) -> DesignationResult<()> {
    let mut kept = Vec::with_capacity(work.candidates.len());
    for mut candidate in std::mem::take(&mut work.candidates) {
        candidate.shared_differences = shared_differences(work, candidate.node)?;
        if candidate.shared_differences > 0 {
            kept.push(candidate);
        } else {
            work.record_prune(candidate.node, PruneReason::NoSharedDifferences);
        }
    }
    work.candidates = kept;

    debug!(
        candidates = work.candidates.len(),
        "filtered clades without shared differences"
    );
    Ok(())
}
