use crate::error::{DesignationError, DesignationResult};
use crate::lineage::options::DesignationParams;
use crate::lineage::tree::{NodeId, PhyloTree};
use crate::lineage::types::{Cluster, LineageLabel};
use crate::types::Metadata;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Labels for a cluster list, aligned by position.
#[derive(Debug, Clone, Default)]
pub struct Naming {
    pub labels: Vec<LineageLabel>,
    /// Distinct previous assignments found under each cluster.
    pub previous: Vec<Vec<String>>,
}

pub(crate) fn is_unset(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NA")
}

/// Distinct previous-assignment labels among every tip below `node`.
pub(crate) fn previous_labels(tree: &PhyloTree, metadata: &Metadata, node: NodeId) -> BTreeSet<String> {
    tree.descendant_tips(node)
        .iter()
        .filter_map(|&tip| tree.tip_label(tip))
        .filter_map(|label| metadata.get(label))
        .filter_map(|record| record.assignment.as_deref())
        .filter(|assignment| !is_unset(assignment))
        .map(|assignment| assignment.trim().to_string())
        .collect()
}

/// Hands out root tokens per prefix namespace, always the lowest unused
/// one, so tokens within a namespace are issued in increasing order.
struct TokenAllocator {
    used: HashMap<Option<String>, BTreeSet<usize>>,
    capacity: usize,
}

impl TokenAllocator {
    fn new(capacity: usize) -> Self {
        Self {
            used: HashMap::new(),
            capacity,
        }
    }

    fn claim(&mut self, prefix: &Option<String>, token: usize) {
        self.used.entry(prefix.clone()).or_default().insert(token);
    }

    fn next(&mut self, prefix: &Option<String>) -> DesignationResult<usize> {
        let used = self.used.entry(prefix.clone()).or_default();
        let token = (0..self.capacity)
            .find(|t| !used.contains(t))
            .ok_or(DesignationError::CapacityExceeded {
                capacity: self.capacity,
            })?;
        used.insert(token);
        Ok(token)
    }
}

/// Name clusters so that nesting and previous assignments show in the label.
///
/// `clusters` must be ordered so every cluster follows its parent, which
/// descending overlap guarantees.
///
/// * The first top-level cluster whose tips carry exactly one previous
///   assignment `L` is named `L_A1`.
/// * Other top-level clusters get the lowest unused token in the namespace
///   of their single previous assignment, or of the clade prefix (the first
///   seeded assignment, else the first single assignment of any cluster)
///   when they have none or several.
/// * Nested clusters extend their parent's path with the next free ordinal;
///   once the parent is `max_dot_depth` levels deep a fresh token from the
///   parent's namespace is used instead.
pub(crate) fn assign_labels(
    tree: &PhyloTree,
    metadata: &Metadata,
    clusters: &[Cluster],
    params: &DesignationParams,
) -> DesignationResult<Naming> {
    let annotations: Vec<BTreeSet<String>> = clusters
        .iter()
        .map(|c| previous_labels(tree, metadata, c.node))
        .collect();

    // Only top-level clusters take a seed; nested ones always extend their
    // parent, so an unused seed falls through to the next top-level cluster.
    let mut seen: HashSet<&str> = HashSet::new();
    let seeds: Vec<Option<String>> = clusters
        .iter()
        .zip(&annotations)
        .map(|(cluster, annotation)| match annotation.iter().next() {
            Some(only)
                if cluster.parent.is_none()
                    && annotation.len() == 1
                    && seen.insert(only.as_str()) =>
            {
                Some(only.clone())
            }
            _ => None,
        })
        .collect();
    let clade_prefix = seeds.iter().flatten().next().cloned().or_else(|| {
        annotations
            .iter()
            .find(|annotation| annotation.len() == 1)
            .and_then(|annotation| annotation.iter().next().cloned())
    });

    let mut tokens = TokenAllocator::new(params.token_capacity);
    for seed in seeds.iter().flatten() {
        tokens.claim(&Some(seed.clone()), 0);
    }

    let mut labels: Vec<LineageLabel> = Vec::with_capacity(clusters.len());
    let mut used: HashSet<LineageLabel> = HashSet::new();
    let mut next_ordinal: Vec<u32> = vec![1; clusters.len()];

    for (pos, cluster) in clusters.iter().enumerate() {
        let parent = cluster
            .parent
            .filter(|&p| p < labels.len())
            .map(|p| (p, labels[p].clone()));

        let label = match (&seeds[pos], parent) {
            (Some(seed), _) => LineageLabel::root(Some(seed.clone()), 0),
            (None, None) => {
                let prefix = match annotations[pos].len() {
                    0 => clade_prefix.clone(),
                    1 => annotations[pos].iter().next().cloned(),
                    _ => {
                        warn!(
                            node = cluster.node,
                            previous = %join(&annotations[pos]),
                            "clade mixes previous assignments; using a fallback token"
                        );
                        clade_prefix.clone()
                    }
                };
                let token = tokens.next(&prefix)?;
                LineageLabel::root(prefix, token)
            }
            (None, Some((_, parent_label))) if parent_label.depth() >= params.max_dot_depth => {
                let token = tokens.next(&parent_label.prefix)?;
                LineageLabel::root(parent_label.prefix.clone(), token)
            }
            (None, Some((p, parent_label))) => {
                let mut label = parent_label.child(next_ordinal[p]);
                while used.contains(&label) {
                    next_ordinal[p] += 1;
                    label = parent_label.child(next_ordinal[p]);
                }
                next_ordinal[p] += 1;
                label
            }
        };

        debug!(cluster = cluster.index, node = cluster.node, label = %label, "named cluster");
        used.insert(label.clone());
        labels.push(label);
    }

    Ok(Naming {
        labels,
        previous: annotations
            .into_iter()
            .map(|a| a.into_iter().collect())
            .collect(),
    })
}

fn join(labels: &BTreeSet<String>) -> String {
    labels.iter().cloned().collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::partition::{assign_deepest, build_partition};
    use crate::lineage::types::Candidate;
    use crate::readers::newick::parse_newick;
    use crate::types::MetadataRecord;

    fn clusters_for(tree: &PhyloTree, nodes: &[NodeId]) -> Vec<Cluster> {
        let mut candidates: Vec<Candidate> = nodes
            .iter()
            .map(|&n| Candidate::new(n, tree.tip_count(n)))
            .collect();
        let assignment = assign_deepest(tree, &candidates);
        build_partition(tree, &mut candidates, &assignment).clusters
    }

    fn metadata_with(tree: &PhyloTree, assignments: &[(&str, &str)]) -> Metadata {
        tree.tip_labels()
            .iter()
            .map(|label| {
                let record = MetadataRecord::new(label.clone());
                match assignments.iter().find(|(id, _)| id == label) {
                    Some((_, assignment)) => record.with_assignment(*assignment),
                    None => record,
                }
            })
            .collect()
    }

    fn names(tree: &PhyloTree, metadata: &Metadata, nodes: &[NodeId], params: &DesignationParams) -> Vec<String> {
        let clusters = clusters_for(tree, nodes);
        assign_labels(tree, metadata, &clusters, params)
            .unwrap()
            .labels
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_nesting_and_siblings() {
        // root 8; 9 = ((a,b),(c,d)) ; 10 = (a,b) ; 11 = (c,d) ; 12 = (e,f,g,h)
        let tree = parse_newick("(((a,b)99,(c,d)99)99,(e,f,g,h)99);").unwrap();
        let metadata = metadata_with(&tree, &[]);
        let labels = names(&tree, &metadata, &[9, 10, 11, 12], &DesignationParams::default());
        assert_eq!(labels, vec!["A1", "A1.1", "A1.2", "B1"]);
    }

    #[test]
    fn test_shared_previous_label_gets_distinct_tokens() {
        let tree = parse_newick("((a,b,c)99,(d,e,f)99);").unwrap();
        let metadata = metadata_with(
            &tree,
            &[("a", "3I"), ("b", "3I"), ("c", "3I"), ("d", "3I"), ("e", "3I"), ("f", "3I")],
        );
        let labels = names(&tree, &metadata, &[7, 8], &DesignationParams::default());
        assert_eq!(labels, vec!["3I_A1", "3I_B1"]);
    }

    #[test]
    fn test_unprefixed_clusters_inherit_clade_prefix() {
        let tree = parse_newick("((a,b,c)99,(d,e,f)99);").unwrap();
        let metadata = metadata_with(&tree, &[("a", "2II"), ("b", "NA")]);
        let labels = names(&tree, &metadata, &[7, 8], &DesignationParams::default());
        assert_eq!(labels, vec!["2II_A1", "2II_B1"]);
    }

    #[test]
    fn test_mixed_parent_keeps_pure_children_nested() {
        // 8 = ((a,b,c),(d,e,f)) mixes X and Y; its children are pure
        let tree = parse_newick("(((a,b,c)99,(d,e,f)99)99,g);").unwrap();
        let metadata = metadata_with(
            &tree,
            &[("a", "X"), ("b", "X"), ("c", "X"), ("d", "Y"), ("e", "Y"), ("f", "Y")],
        );
        let clusters = clusters_for(&tree, &[8, 9, 10]);
        let naming = assign_labels(&tree, &metadata, &clusters, &DesignationParams::default()).unwrap();
        let labels: Vec<String> = naming.labels.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["X_A1", "X_A1.1", "X_A1.2"]);
        assert_eq!(naming.previous[0], vec!["X".to_string(), "Y".to_string()]);
        assert_eq!(naming.previous[2], vec!["Y".to_string()]);
    }

    #[test]
    fn test_seed_passes_to_later_top_level_cluster() {
        // 12 mixes X and Y over 13 (X) and 14 (Y); 15 is a separate X clade
        let tree = parse_newick("((((a,b,c)99,(d,e,f)99)99,(g,h,i)99),j);").unwrap();
        let metadata = metadata_with(
            &tree,
            &[
                ("a", "X"),
                ("b", "X"),
                ("c", "X"),
                ("d", "Y"),
                ("e", "Y"),
                ("f", "Y"),
                ("g", "X"),
                ("h", "X"),
                ("i", "X"),
            ],
        );
        let labels = names(&tree, &metadata, &[12, 13, 14, 15], &DesignationParams::default());
        assert_eq!(labels, vec!["X_B1", "X_B1.1", "X_B1.2", "X_A1"]);
    }

    #[test]
    fn test_depth_ladder_moves_to_fresh_token() {
        let tree = parse_newick("(((((a,b)99,c)99,d)99,e)99,f);").unwrap();
        let params = DesignationParams::default().with_max_dot_depth(2);
        let metadata = metadata_with(&tree, &[]);
        // 7 = outermost, 10 = (a,b)
        let labels = names(&tree, &metadata, &[7, 8, 9, 10], &params);
        assert_eq!(labels, vec!["A1", "A1.1", "A1.1.1", "B1"]);
    }

    #[test]
    fn test_capacity_exceeded() {
        let tree = parse_newick("((a,b)99,(c,d)99);").unwrap();
        let metadata = metadata_with(&tree, &[]);
        let clusters = clusters_for(&tree, &[5, 6]);
        let params = DesignationParams::default().with_token_capacity(1);
        let err = assign_labels(&tree, &metadata, &clusters, &params).unwrap_err();
        assert_eq!(err, DesignationError::CapacityExceeded { capacity: 1 });
    }

    #[test]
    fn test_labels_are_unique() {
        let tree = parse_newick("((((a,b)99,(c,d)99)99,((e,f)99,(g,h)99)99)99,((i,j)99,(k,l)99)99);").unwrap();
        let metadata = metadata_with(&tree, &[]);
        let nodes: Vec<NodeId> = tree.internal_nodes().filter(|&n| n != tree.root()).collect();
        let labels = names(&tree, &metadata, &nodes, &DesignationParams::default());
        let distinct: HashSet<_> = labels.iter().collect();
        assert_eq!(distinct.len(), labels.len());
    }
}
