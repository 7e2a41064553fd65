use crate::error::{DesignationError, DesignationResult};
use crate::lineage::tree::{NodeId, PhyloTree};
use crate::lineage::types::{Candidate, Cluster, PruneReason};
use crate::lineage::WorkingSet;
use tracing::debug;

/// Final clusters plus the owning cluster of every tip.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub clusters: Vec<Cluster>,
    /// Indexed by tip node id; holds a position into `clusters`.
    pub tip_cluster: Vec<Option<usize>>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Maps node id -> position in `candidates` for nodes that are candidates.
fn candidate_index(tree: &PhyloTree, candidates: &[Candidate]) -> Vec<Option<usize>> {
    let mut index = vec![None; tree.n_nodes()];
    for (pos, candidate) in candidates.iter().enumerate() {
        index[candidate.node] = Some(pos);
    }
    index
}

/// Nearest strict ancestor of `node` that is a candidate.
fn enclosing(tree: &PhyloTree, index: &[Option<usize>], node: NodeId) -> Option<usize> {
    let mut current = tree.parent(node);
    while let Some(n) = current {
        if let Some(pos) = index[n] {
            return Some(pos);
        }
        current = tree.parent(n);
    }
    None
}

/// Count, for each candidate, the other candidates nested inside it.
pub(crate) fn score_overlaps(tree: &PhyloTree, candidates: &mut [Candidate]) {
    let index = candidate_index(tree, candidates);
    let mut overlap = vec![0usize; candidates.len()];
    for candidate in candidates.iter() {
        let mut current = enclosing(tree, &index, candidate.node);
        while let Some(pos) = current {
            overlap[pos] += 1;
            current = enclosing(tree, &index, candidates[pos].node);
        }
    }
    for (candidate, count) in candidates.iter_mut().zip(overlap) {
        candidate.overlap = count;
    }
}

/// Give every tip to the most deeply nested candidate containing it,
/// found by walking the tip's ancestor chain upwards.
pub(crate) fn assign_deepest(tree: &PhyloTree, candidates: &[Candidate]) -> Vec<Option<usize>> {
    let index = candidate_index(tree, candidates);
    (0..tree.n_tips())
        .map(|tip| enclosing(tree, &index, tip))
        .collect()
}

fn assigned_counts(assignment: &[Option<usize>], n_candidates: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_candidates];
    for pos in assignment.iter().flatten() {
        counts[*pos] += 1;
    }
    counts
}

/// Undersized candidates with no undersized candidate nested below them.
/// Removing the deepest first lets their tips fall back to the parent,
/// which may then meet the minimum itself.
fn deepest_undersized(tree: &PhyloTree, candidates: &[Candidate], counts: &[usize], min: usize) -> Vec<usize> {
    let undersized: Vec<usize> = (0..candidates.len()).filter(|&pos| counts[pos] < min).collect();
    undersized
        .iter()
        .copied()
        .filter(|&pos| {
            !undersized
                .iter()
                .any(|&other| tree.is_ancestor(candidates[pos].node, candidates[other].node))
        })
        .collect()
}

/// Candidates whose tip count sits within `min_gap` of their nearest
/// surviving enclosing candidate. Parents are judged before children so a
/// child is compared against what actually remains above it.
fn too_close_to_parent(
    tree: &PhyloTree,
    candidates: &[Candidate],
    min_gap: usize,
) -> Vec<(usize, usize, usize)> {
    let mut surviving: Vec<Option<usize>> = vec![None; tree.n_nodes()];
    let index = candidate_index(tree, candidates);
    let mut violations = Vec::new();

    for &node in tree.preorder() {
        let Some(pos) = index[node] else {
            continue;
        };
        match enclosing(tree, &surviving, node) {
            Some(parent) => {
                let gap = candidates[parent]
                    .tip_count
                    .saturating_sub(candidates[pos].tip_count);
                if gap < min_gap {
                    violations.push((pos, parent, gap));
                } else {
                    surviving[node] = Some(pos);
                }
            }
            None => surviving[node] = Some(pos),
        }
    }
    violations
}

fn remove_positions(candidates: Vec<Candidate>, positions: &[usize]) -> (Vec<Candidate>, Vec<Candidate>) {
    candidates
        .into_iter()
        .enumerate()
        .fold((Vec::new(), Vec::new()), |(mut kept, mut removed), (pos, c)| {
            if positions.contains(&pos) {
                removed.push(c);
            } else {
                kept.push(c);
            }
            (kept, removed)
        })
}

/// Resolve nested candidates into a partition of the tips.
///
/// Each round assigns tips to their deepest candidate, then removes either
/// the deepest clusters that claimed fewer than `min_assigned` tips or, once
/// none remain, the clusters too close in size to their parent. Every round
/// that changes anything removes at least one candidate, so the loop ends
/// after at most `candidates + 1` rounds.
pub(crate) fn resolve(work: &mut WorkingSet<'_>) -> DesignationResult<Partition> {
    let tree = work.tree;
    let params = work.params;
    let max_rounds = if params.max_partition_rounds > 0 {
        params.max_partition_rounds
    } else {
        work.candidates.len() + 1
    };

    let mut rounds = 0;
    let assignment = loop {
        rounds += 1;
        if rounds > max_rounds {
            return Err(DesignationError::NonConvergentPartition { rounds: max_rounds });
        }
        let before = work.candidates.len();

        let assignment = assign_deepest(tree, &work.candidates);
        let counts = assigned_counts(&assignment, work.candidates.len());

        let undersized = deepest_undersized(tree, &work.candidates, &counts, params.min_assigned);
        if !undersized.is_empty() {
            let (kept, removed) = remove_positions(std::mem::take(&mut work.candidates), &undersized);
            for (candidate, pos) in removed.into_iter().zip(&undersized) {
                work.record_prune(
                    candidate.node,
                    PruneReason::TooFewAssigned {
                        assigned: counts[*pos],
                    },
                );
            }
            work.candidates = kept;
            assert!(work.candidates.len() < before);
            continue;
        }

        let mut close = too_close_to_parent(tree, &work.candidates, params.min_parent_gap);
        if !close.is_empty() {
            close.sort_by_key(|&(pos, _, _)| pos);
            let positions: Vec<usize> = close.iter().map(|&(pos, _, _)| pos).collect();
            let reasons: Vec<PruneReason> = close
                .iter()
                .map(|&(_, parent, gap)| PruneReason::TooCloseToParent {
                    parent: tree
                        .ancestral_id(work.candidates[parent].node)
                        .unwrap_or_default(),
                    gap,
                })
                .collect();
            let (kept, removed) = remove_positions(std::mem::take(&mut work.candidates), &positions);
            for (candidate, reason) in removed.into_iter().zip(reasons) {
                work.record_prune(candidate.node, reason);
            }
            work.candidates = kept;
            assert!(work.candidates.len() < before);
            continue;
        }

        break assignment;
    };

    debug!(rounds, clusters = work.candidates.len(), "partition resolved");
    Ok(build_partition(tree, &mut work.candidates, &assignment))
}

/// Order surviving candidates by descending overlap (ties by preorder) and
/// number them 1..K.
pub(crate) fn build_partition(tree: &PhyloTree, candidates: &mut [Candidate], assignment: &[Option<usize>]) -> Partition {
    score_overlaps(tree, candidates);

    let mut rank = vec![0usize; tree.n_nodes()];
    for (r, &node) in tree.preorder().iter().enumerate() {
        rank[node] = r;
    }
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .overlap
            .cmp(&candidates[a].overlap)
            .then(rank[candidates[a].node].cmp(&rank[candidates[b].node]))
    });

    let mut new_position = vec![0usize; candidates.len()];
    for (new_pos, &old_pos) in order.iter().enumerate() {
        new_position[old_pos] = new_pos;
    }

    let index = candidate_index(tree, candidates);
    let mut clusters: Vec<Cluster> = order
        .iter()
        .enumerate()
        .map(|(new_pos, &old_pos)| {
            let candidate = &candidates[old_pos];
            Cluster {
                index: new_pos + 1,
                node: candidate.node,
                tip_count: candidate.tip_count,
                shared_differences: candidate.shared_differences,
                overlap: candidate.overlap,
                parent: enclosing(tree, &index, candidate.node).map(|p| new_position[p]),
                members: Vec::new(),
            }
        })
        .collect();

    let tip_cluster: Vec<Option<usize>> = assignment
        .iter()
        .map(|pos| pos.map(|p| new_position[p]))
        .collect();
    for (tip, cluster) in tip_cluster.iter().enumerate() {
        if let Some(c) = cluster {
            clusters[*c].members.push(tip);
        }
    }

    Partition {
        clusters,
        tip_cluster,
    }
}
