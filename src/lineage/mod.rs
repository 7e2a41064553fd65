pub mod candidates;
pub mod distinctiveness;
pub mod naming;
pub mod options;
pub mod partition;
pub mod tree;
pub mod types;
mod validation;

pub use options::DesignationParams;
pub use partition::Partition;
pub use tree::{NodeId, PhyloTree};
pub use types::{
    Candidate, Cluster, Designation, Lineage, LineageLabel, Outcome, PruneReason,
    PrunedCandidate,
};

use crate::error::DesignationResult;
use crate::types::{Alignment, AncestralStates, Metadata, SequenceRow, SequenceStats};
use naming::Naming;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Mutable state threaded through the pipeline stages. Inputs are borrowed
/// read-only for the whole run.
pub(crate) struct WorkingSet<'a> {
    pub(crate) tree: &'a PhyloTree,
    pub(crate) alignment: &'a Alignment,
    pub(crate) ancestral: &'a AncestralStates,
    pub(crate) metadata: &'a Metadata,
    pub(crate) params: &'a DesignationParams,
    pub(crate) candidates: Vec<Candidate>,
    pub(crate) pruned: Vec<PrunedCandidate>,
}

impl<'a> WorkingSet<'a> {
    pub(crate) fn new(
        tree: &'a PhyloTree,
        alignment: &'a Alignment,
        ancestral: &'a AncestralStates,
        metadata: &'a Metadata,
        params: &'a DesignationParams,
    ) -> Self {
        Self {
            tree,
            alignment,
            ancestral,
            metadata,
            params,
            candidates: Vec::new(),
            pruned: Vec::new(),
        }
    }

    pub(crate) fn record_prune(&mut self, node: NodeId, reason: PruneReason) {
        let ancestral_id = self.tree.ancestral_id(node).unwrap_or_default();
        debug!(node, ancestral_id = %ancestral_id, ?reason, "pruned candidate");
        self.pruned.push(PrunedCandidate {
            node,
            ancestral_id,
            reason,
        });
    }
}

/// Designate lineages with default thresholds and the given support cut-off.
pub fn designate(
    tree: &PhyloTree,
    min_support: f64,
    alignment: &Alignment,
    metadata: &Metadata,
    ancestral: &AncestralStates,
) -> DesignationResult<Designation> {
    let params = DesignationParams::default().with_min_support(min_support);
    designate_with(tree, alignment, metadata, ancestral, &params)
}

/// Run detection, coverage correction, distinctiveness filtering, partition
/// resolution and naming, producing one row per metadata record.
pub fn designate_with(
    tree: &PhyloTree,
    alignment: &Alignment,
    metadata: &Metadata,
    ancestral: &AncestralStates,
    params: &DesignationParams,
) -> DesignationResult<Designation> {
    validation::validate_inputs(tree, alignment, metadata)?;

    let mut work = WorkingSet::new(tree, alignment, ancestral, metadata, params);
    candidates::detect(&mut work)?;
    candidates::correct_coverage(&mut work);
    distinctiveness::filter(&mut work)?;
    let partition = partition::resolve(&mut work)?;
    let naming = naming::assign_labels(tree, metadata, &partition.clusters, params)?;

    let designation = assemble(&work, &partition, &naming);
    match designation.outcome {
        Outcome::Designated => info!(
            lineages = designation.lineages.len(),
            assigned = partition.tip_cluster.iter().flatten().count(),
            pruned = designation.pruned.len(),
            "designation complete"
        ),
        Outcome::NoCandidates => {
            warn!("no clade met the support, size and distinctiveness thresholds")
        }
    }
    Ok(designation)
}

fn assemble(work: &WorkingSet<'_>, partition: &Partition, naming: &Naming) -> Designation {
    let tree = work.tree;
    let rendered: Vec<String> = naming.labels.iter().map(ToString::to_string).collect();

    let lineages = partition
        .clusters
        .iter()
        .enumerate()
        .map(|(pos, cluster)| {
            let member_records: Vec<_> = cluster
                .members
                .iter()
                .filter_map(|&tip| tree.tip_label(tip))
                .filter_map(|label| work.metadata.get(label))
                .collect();
            let years: Vec<i32> = member_records.iter().filter_map(|r| r.year).collect();
            let countries: BTreeSet<String> = member_records
                .iter()
                .filter_map(|r| r.country.clone())
                .collect();

            Lineage {
                label: rendered[pos].clone(),
                node: cluster.node,
                ancestral_id: tree.ancestral_id(cluster.node).unwrap_or_default(),
                parent: cluster.parent.map(|p| rendered[p].clone()),
                tip_count: cluster.tip_count,
                assigned: cluster.members.len(),
                shared_differences: cluster.shared_differences,
                previous_labels: naming.previous[pos].clone(),
                first_year: years.iter().copied().min(),
                last_year: years.iter().copied().max(),
                countries: countries.into_iter().collect(),
            }
        })
        .collect();

    let rows = work
        .metadata
        .iter()
        .map(|record| {
            let stats = work.alignment.get(&record.id).map(SequenceStats::from_bases);
            let lineage = tree
                .tip_id(&record.id)
                .and_then(|tip| partition.tip_cluster[tip])
                .map(|pos| rendered[pos].clone());
            SequenceRow {
                id: record.id.clone(),
                n_count: stats.map(|s| s.n_count),
                gap_count: stats.map(|s| s.gap_count),
                length: stats.map(|s| s.post_filter_length()),
                year: record.year,
                country: record.country.clone(),
                lineage,
                previous_assignment: record.assignment.clone(),
            }
        })
        .collect();

    Designation {
        outcome: if partition.is_empty() {
            Outcome::NoCandidates
        } else {
            Outcome::Designated
        },
        rows,
        lineages,
        pruned: work.pruned.clone(),
    }
}
