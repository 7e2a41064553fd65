use crate::error::{DesignationError, DesignationResult};
use std::collections::HashMap;

pub type NodeId = usize;

/// Rooted, possibly polytomous tree with tips numbered `0..n_tips` and
/// internal nodes numbered `n_tips..n_nodes`.
///
/// Traversal orders, subtree sizes, depths and descendant tip lists are
/// computed once at construction; the tree is immutable afterwards.
#[derive(Debug, Clone)]
pub struct PhyloTree {
    tip_labels: Vec<String>,
    tip_index: HashMap<String, NodeId>,
    parent: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    support: Vec<Option<f64>>,
    root: NodeId,
    preorder: Vec<NodeId>,
    preorder_rank: Vec<usize>,
    subtree_size: Vec<usize>,
    depth: Vec<usize>,
    descendant_tips: Vec<Vec<NodeId>>,
}

impl PhyloTree {
    /// Build a tree from ordered child lists.
    ///
    /// `children` and `support` are indexed by node id and must cover every
    /// node; tips must have no children and every internal node needs at
    /// least one.
    pub fn from_children(
        tip_labels: Vec<String>,
        children: Vec<Vec<NodeId>>,
        support: Vec<Option<f64>>,
    ) -> DesignationResult<Self> {
        let n_tips = tip_labels.len();
        let n_nodes = children.len();
        if n_tips == 0 {
            return Err(DesignationError::EmptyTree);
        }
        if n_nodes < n_tips {
            return Err(DesignationError::MalformedTree(format!(
                "{} nodes cannot hold {} tips",
                n_nodes, n_tips
            )));
        }
        if support.len() != n_nodes {
            return Err(DesignationError::MalformedTree(format!(
                "support has {} entries for {} nodes",
                support.len(),
                n_nodes
            )));
        }

        let mut parent: Vec<Option<NodeId>> = vec![None; n_nodes];
        for (node, kids) in children.iter().enumerate() {
            if node < n_tips && !kids.is_empty() {
                return Err(DesignationError::MalformedTree(format!(
                    "tip '{}' has children",
                    tip_labels[node]
                )));
            }
            if node >= n_tips && kids.is_empty() {
                return Err(DesignationError::MalformedTree(format!(
                    "internal node {} has no children",
                    node
                )));
            }
            for &child in kids {
                if child >= n_nodes {
                    return Err(DesignationError::MalformedTree(format!(
                        "node {} references unknown child {}",
                        node, child
                    )));
                }
                if parent[child].replace(node).is_some() {
                    return Err(DesignationError::MalformedTree(format!(
                        "node {} has more than one parent",
                        child
                    )));
                }
            }
        }

        let roots: Vec<NodeId> = (0..n_nodes).filter(|&n| parent[n].is_none()).collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => {
                return Err(DesignationError::MalformedTree(
                    "no root node (every node has a parent)".to_string(),
                ))
            }
            _ => {
                return Err(DesignationError::MalformedTree(format!(
                    "{} root nodes found",
                    roots.len()
                )))
            }
        };

        let mut tip_index = HashMap::with_capacity(n_tips);
        for (idx, label) in tip_labels.iter().enumerate() {
            if tip_index.insert(label.clone(), idx).is_some() {
                return Err(DesignationError::MalformedTree(format!(
                    "duplicate tip label '{}'",
                    label
                )));
            }
        }

        let mut preorder = Vec::with_capacity(n_nodes);
        let mut depth = vec![0usize; n_nodes];
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            preorder.push(node);
            for &child in children[node].iter().rev() {
                depth[child] = depth[node] + 1;
                stack.push(child);
            }
        }
        if preorder.len() != n_nodes {
            return Err(DesignationError::MalformedTree(format!(
                "{} of {} nodes are unreachable from the root",
                n_nodes - preorder.len(),
                n_nodes
            )));
        }

        let mut preorder_rank = vec![0usize; n_nodes];
        for (rank, &node) in preorder.iter().enumerate() {
            preorder_rank[node] = rank;
        }

        let mut subtree_size = vec![1usize; n_nodes];
        let mut descendant_tips: Vec<Vec<NodeId>> = vec![Vec::new(); n_nodes];
        for &node in preorder.iter().rev() {
            if node < n_tips {
                descendant_tips[node].push(node);
                continue;
            }
            let mut tips = Vec::new();
            for &child in &children[node] {
                subtree_size[node] += subtree_size[child];
                tips.extend_from_slice(&descendant_tips[child]);
            }
            descendant_tips[node] = tips;
        }

        Ok(PhyloTree {
            tip_labels,
            tip_index,
            parent,
            children,
            support,
            root,
            preorder,
            preorder_rank,
            subtree_size,
            depth,
            descendant_tips,
        })
    }

    /// Build a tree from a parent table (`None` marks the root). Children
    /// are ordered by node id.
    pub fn from_parents(
        tip_labels: Vec<String>,
        parents: &[Option<NodeId>],
        support: Vec<Option<f64>>,
    ) -> DesignationResult<Self> {
        let mut children = vec![Vec::new(); parents.len()];
        for (node, parent) in parents.iter().enumerate() {
            if let Some(p) = *parent {
                if p >= parents.len() {
                    return Err(DesignationError::MalformedTree(format!(
                        "node {} references unknown parent {}",
                        node, p
                    )));
                }
                children[p].push(node);
            }
        }
        Self::from_children(tip_labels, children, support)
    }

    pub fn n_tips(&self) -> usize {
        self.tip_labels.len()
    }

    pub fn n_nodes(&self) -> usize {
        self.children.len()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_tip(&self, node: NodeId) -> bool {
        node < self.n_tips()
    }

    pub fn internal_nodes(&self) -> impl Iterator<Item = NodeId> {
        self.n_tips()..self.n_nodes()
    }

    pub fn tip_labels(&self) -> &[String] {
        &self.tip_labels
    }

    pub fn tip_label(&self, node: NodeId) -> Option<&str> {
        self.tip_labels.get(node).map(String::as_str)
    }

    pub fn tip_id(&self, label: &str) -> Option<NodeId> {
        self.tip_index.get(label).copied()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent[node]
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node]
    }

    pub fn support(&self, node: NodeId) -> Option<f64> {
        self.support[node]
    }

    /// True when at least one internal node carries a support value.
    pub fn has_support(&self) -> bool {
        self.internal_nodes().any(|n| self.support[n].is_some())
    }

    pub fn preorder(&self) -> &[NodeId] {
        &self.preorder
    }

    pub fn depth(&self, node: NodeId) -> usize {
        self.depth[node]
    }

    pub fn descendant_tips(&self, node: NodeId) -> &[NodeId] {
        &self.descendant_tips[node]
    }

    pub fn tip_count(&self, node: NodeId) -> usize {
        self.descendant_tips[node].len()
    }

    /// Nodes on the path from the root down to `node`, both included.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(p) = self.parent[current] {
            path.push(p);
            current = p;
        }
        path.reverse();
        path
    }

    /// True when `descendant` lies in the subtree of `ancestor` (self included).
    pub fn contains(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let start = self.preorder_rank[ancestor];
        let rank = self.preorder_rank[descendant];
        rank >= start && rank < start + self.subtree_size[ancestor]
    }

    /// Strict ancestry: `ancestor` contains `descendant` and they differ.
    pub fn is_ancestor(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        ancestor != descendant && self.contains(ancestor, descendant)
    }

    /// Identifier of the ancestral reconstruction row for an internal node.
    pub fn ancestral_id(&self, node: NodeId) -> Option<String> {
        if self.is_tip(node) || node >= self.n_nodes() {
            return None;
        }
        Some(format!("NODE_{:07}", node - self.n_tips() + 1))
    }

    /// Copy the clade rooted at `node` into a standalone tree.
    ///
    /// Tips keep their left-to-right order and internal nodes are renumbered
    /// in preorder. The returned vector maps each new node id to the id it
    /// had in `self`.
    pub fn extract_clade(&self, node: NodeId) -> DesignationResult<(PhyloTree, Vec<NodeId>)> {
        let start = self.preorder_rank[node];
        let members = &self.preorder[start..start + self.subtree_size[node]];

        let tips = self.descendant_tips(node);
        let mut old_to_new: HashMap<NodeId, NodeId> = HashMap::with_capacity(members.len());
        let mut new_to_old: Vec<NodeId> = Vec::with_capacity(members.len());
        for &tip in tips {
            old_to_new.insert(tip, new_to_old.len());
            new_to_old.push(tip);
        }
        for &member in members.iter().filter(|&&m| !self.is_tip(m)) {
            old_to_new.insert(member, new_to_old.len());
            new_to_old.push(member);
        }

        let tip_labels = tips.iter().map(|&t| self.tip_labels[t].clone()).collect();
        let children = new_to_old
            .iter()
            .map(|&old| self.children[old].iter().map(|c| old_to_new[c]).collect())
            .collect();
        let support = new_to_old.iter().map(|&old| self.support[old]).collect();

        let clade = PhyloTree::from_children(tip_labels, children, support)?;
        Ok((clade, new_to_old))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ((a,b)90,(c,d,e)60)
    fn small_tree() -> PhyloTree {
        let tips = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let children = vec![
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![6, 7],
            vec![0, 1],
            vec![2, 3, 4],
        ];
        let support = vec![None, None, None, None, None, None, Some(90.0), Some(60.0)];
        PhyloTree::from_children(tips, children, support).unwrap()
    }

    #[test]
    fn test_tip_label_lookup() {
        let tree = small_tree();
        assert_eq!(tree.tip_label(2), Some("c"));
        assert_eq!(tree.tip_label(6), None);
        assert_eq!(tree.tip_id("c"), Some(2));
    }

    #[test]
    fn test_descendants_and_ancestors() {
        let tree = small_tree();
        assert_eq!(tree.root(), 5);
        assert_eq!(tree.descendant_tips(5), &[0, 1, 2, 3, 4]);
        assert_eq!(tree.descendant_tips(7), &[2, 3, 4]);
        assert_eq!(tree.ancestors(3), vec![5, 7, 3]);
        assert_eq!(tree.depth(3), 2);
        assert!(tree.is_ancestor(5, 7));
        assert!(tree.is_ancestor(7, 4));
        assert!(!tree.is_ancestor(6, 4));
        assert!(!tree.is_ancestor(7, 7));
        assert!(tree.contains(7, 7));
    }

    #[test]
    fn test_ancestral_ids() {
        let tree = small_tree();
        assert_eq!(tree.ancestral_id(5).as_deref(), Some("NODE_0000001"));
        assert_eq!(tree.ancestral_id(7).as_deref(), Some("NODE_0000003"));
        assert_eq!(tree.ancestral_id(2), None);
    }

    #[test]
    fn test_from_parents_matches_children() {
        let tips = vec!["x".to_string(), "y".to_string()];
        let tree = PhyloTree::from_parents(tips, &[Some(2), Some(2), None], vec![None, None, Some(1.0)])
            .unwrap();
        assert_eq!(tree.children(2), &[0, 1]);
        assert!(tree.has_support());
    }

    #[test]
    fn test_rejects_two_roots() {
        let tips = vec!["x".to_string(), "y".to_string()];
        let err = PhyloTree::from_parents(tips, &[None, None], vec![None, None]).unwrap_err();
        assert!(matches!(err, DesignationError::MalformedTree(_)));
    }

    #[test]
    fn test_rejects_cycle() {
        let tips = vec!["x".to_string()];
        let children = vec![vec![], vec![0, 2], vec![1]];
        let err = PhyloTree::from_children(tips, children, vec![None; 3]).unwrap_err();
        assert!(matches!(err, DesignationError::MalformedTree(_)));
    }

    #[test]
    fn test_extract_clade() {
        let tree = small_tree();
        let (clade, map) = tree.extract_clade(7).unwrap();
        assert_eq!(clade.n_tips(), 3);
        assert_eq!(clade.tip_labels(), &["c", "d", "e"]);
        assert_eq!(clade.root(), 3);
        assert_eq!(clade.support(3), Some(60.0));
        assert_eq!(map, vec![2, 3, 4, 7]);
    }
}
