//! The node table of one condition and its reduction rules.
//!
//! Reduction folds a node into its single parent whenever the two share a
//! successor (the short-circuit shape of `and` / `or`) or the node has been
//! resolved to a value. Each successful fold removes at least one node, so
//! the loop in [`ConditionGraph::reduce`] terminates.

use rustc_hash::FxHashMap;

use cinder_hir::relational::RelationalExpression;
use cinder_hir::types::{LogicalOp, ResolvedValue};

use super::node::{ConditionNode, LeafValue, NodeKind};
use crate::error::InconclusiveReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    True,
    False,
}

#[derive(Debug, Clone)]
pub struct ConditionGraph {
    nodes: FxHashMap<usize, ConditionNode>,
    root: usize,
}

impl ConditionGraph {
    pub fn new(root: usize) -> Self {
        Self {
            nodes: FxHashMap::default(),
            root,
        }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn insert(&mut self, node: ConditionNode) {
        self.nodes.insert(node.pc, node);
    }

    pub fn get(&self, key: usize) -> Option<&ConditionNode> {
        self.nodes.get(&key)
    }

    pub fn contains(&self, key: usize) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every successor key referenced by a branch, deduplicated and sorted.
    pub fn targets(&self) -> Vec<usize> {
        let mut targets: Vec<usize> = self
            .nodes
            .values()
            .filter_map(ConditionNode::successors)
            .flat_map(|(t, f)| [t, f])
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    /// Recompute every `parents` set from the branch edges.
    pub fn link_parents(&mut self) {
        let edges: Vec<(usize, usize)> = self
            .nodes
            .values()
            .filter_map(|node| node.successors().map(|(t, f)| (node.pc, t, f)))
            .flat_map(|(pc, t, f)| [(t, pc), (f, pc)])
            .collect();
        for node in self.nodes.values_mut() {
            node.parents.clear();
        }
        for (child, parent) in edges {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parents.insert(parent);
            }
        }
    }

    /// Drop every node other than the root that nothing points to.
    pub fn remove_orphans(&mut self) {
        loop {
            let root = self.root;
            let orphans: Vec<usize> = self
                .nodes
                .values()
                .filter(|node| node.pc != root && node.parents.is_empty())
                .map(|node| node.pc)
                .collect();
            if orphans.is_empty() {
                return;
            }
            for key in orphans {
                self.nodes.remove(&key);
            }
            self.link_parents();
        }
    }

    /// Nodes that still carry a statement or a non-boolean value.
    pub fn non_boolean_count(&self) -> usize {
        self.nodes.values().filter(|n| !n.is_boolean_leaf()).count()
    }

    /// Fold nodes into their parents until one unresolved node is left.
    pub fn reduce(&mut self) -> Result<(), InconclusiveReason> {
        loop {
            if self.non_boolean_count() <= 1 {
                return Ok(());
            }
            let mut keys: Vec<usize> = self.nodes.keys().copied().collect();
            keys.sort_unstable_by(|a, b| b.cmp(a));
            let progressed = keys.into_iter().any(|key| self.analyse(key));
            if !progressed {
                return Err(InconclusiveReason::Stalled {
                    remaining: self.non_boolean_count(),
                });
            }
        }
    }

    /// Try to fold the node at `key` into its parent. Returns whether the
    /// graph changed.
    ///
    /// Only nodes with exactly one parent are candidates: folding a shared
    /// node into one parent would change what the other parent computes.
    pub fn analyse(&mut self, key: usize) -> bool {
        let Some(node) = self.nodes.get(&key) else {
            return false;
        };
        if node.parents.len() != 1 || node.is_boolean_leaf() {
            return false;
        }
        let Some(&parent_key) = node.parents.iter().next() else {
            return false;
        };
        let Some((p_true, p_false)) = self.nodes.get(&parent_key).and_then(|p| p.successors())
        else {
            return false;
        };
        let side = if p_true == key && p_false != key {
            Side::True
        } else if p_false == key && p_true != key {
            Side::False
        } else {
            return false;
        };

        if self.merge_shared_successor(parent_key, key, side) {
            return true;
        }
        self.absorb_resolved(parent_key, key, side)
    }

    /// `P -> N` where N also leads to P's other successor: `P and N` on the
    /// true side, `P or N` on the false side.
    fn merge_shared_successor(&mut self, parent_key: usize, key: usize, side: Side) -> bool {
        let (Some((p_true, p_false)), Some((n_true, n_false))) = (
            self.nodes.get(&parent_key).and_then(|p| p.successors()),
            self.nodes.get(&key).and_then(|n| n.successors()),
        ) else {
            return false;
        };
        let (shared, op, on_true, on_false) = match side {
            Side::True => (n_false == p_false, LogicalOp::And, n_true, p_false),
            Side::False => (n_true == p_true, LogicalOp::Or, p_true, n_false),
        };
        if !shared {
            return false;
        }
        let (Some(parent), Some(child)) = (self.nodes.remove(&parent_key), self.nodes.remove(&key))
        else {
            return false;
        };
        let (Some(left), Some(right)) = (parent.statement().cloned(), child.statement().cloned())
        else {
            return false;
        };
        let statement = left.combine(right, op);
        log::trace!("merged {} into {}: {}", key, parent_key, statement);

        let mut merged = ConditionNode::branch(parent_key, statement, on_true, on_false);
        merged.assigns = parent.assigns.or(child.assigns);
        self.insert(merged);
        self.link_parents();
        self.remove_orphans();
        true
    }

    /// N is resolved to a value: fold it and P's other successor into P's
    /// statement and turn P into a leaf.
    fn absorb_resolved(&mut self, parent_key: usize, key: usize, side: Side) -> bool {
        let Some(operand) = self.resolved_operand(key) else {
            return false;
        };
        let Some((p_true, p_false)) = self.nodes.get(&parent_key).and_then(|p| p.successors())
        else {
            return false;
        };
        let other = match side {
            Side::True => p_false,
            Side::False => p_true,
        };
        let Some(other) = self.nodes.get(&other).and_then(|n| n.resolved()) else {
            return false;
        };
        let (reverse_parent, op) = match (side, other) {
            (Side::True, ResolvedValue::BooleanFalse | ResolvedValue::Nil) => (false, LogicalOp::And),
            (Side::True, ResolvedValue::BooleanTrue) => (true, LogicalOp::Or),
            (Side::False, ResolvedValue::BooleanTrue | ResolvedValue::Nil) => (false, LogicalOp::Or),
            (Side::False, ResolvedValue::BooleanFalse) => (true, LogicalOp::And),
            (_, ResolvedValue::Generic(_)) => return false,
        };

        let Some(mut statement) = self.nodes.get(&parent_key).and_then(|p| p.statement()).cloned()
        else {
            return false;
        };
        if reverse_parent {
            statement.reverse();
        }
        if let Some(operand) = operand {
            statement = statement.combine(operand, op);
        }
        log::trace!("terminated {} with {}: {}", parent_key, key, statement);

        self.nodes.remove(&key);
        if let Some(parent) = self.nodes.get_mut(&parent_key) {
            parent.kind = NodeKind::Leaf(LeafValue::Terminated(statement));
        }
        self.link_parents();
        self.remove_orphans();
        true
    }

    /// The operand of a node that needs no further reduction: a leaf, or a
    /// branch whose successors are opposite booleans (normalised so the
    /// statement means "true"). `None` when the node is not resolved yet.
    fn resolved_operand(&self, key: usize) -> Option<Option<RelationalExpression>> {
        let node = self.nodes.get(&key)?;
        match &node.kind {
            NodeKind::Leaf(value) => Some(value.operand()),
            NodeKind::Branch {
                statement,
                on_true,
                on_false,
            } => {
                let t = self.nodes.get(on_true).and_then(ConditionNode::boolean);
                let f = self.nodes.get(on_false).and_then(ConditionNode::boolean);
                match (t, f) {
                    (Some(true), Some(false)) => Some(Some(statement.clone())),
                    (Some(false), Some(true)) => Some(Some(statement.clone().reversed())),
                    _ => None,
                }
            }
        }
    }

    /// The root's statement, normalised so that it reads as the condition
    /// under which the "true" outcome happens.
    pub fn finalize(&self) -> Result<RelationalExpression, InconclusiveReason> {
        let root = self
            .nodes
            .get(&self.root)
            .ok_or(InconclusiveReason::UnresolvableLeaf { pc: self.root })?;
        match &root.kind {
            NodeKind::Branch {
                statement,
                on_true,
                on_false,
            } => {
                let t = self.nodes.get(on_true).and_then(ConditionNode::boolean);
                let f = self.nodes.get(on_false).and_then(ConditionNode::boolean);
                if t == Some(false) && f == Some(true) {
                    Ok(statement.clone().reversed())
                } else {
                    Ok(statement.clone())
                }
            }
            NodeKind::Leaf(LeafValue::Terminated(statement)) => Ok(statement.clone()),
            NodeKind::Leaf(LeafValue::Resolved(_)) => {
                Err(InconclusiveReason::UnresolvableLeaf { pc: self.root })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(pc: usize, text: &str, on_true: usize, on_false: usize) -> ConditionNode {
        ConditionNode::branch(pc, RelationalExpression::leaf(text), on_true, on_false)
    }

    fn leaf(pc: usize, value: ResolvedValue) -> ConditionNode {
        ConditionNode::leaf(pc, value)
    }

    fn graph(nodes: Vec<ConditionNode>) -> ConditionGraph {
        let mut graph = ConditionGraph::new(nodes[0].pc);
        for node in nodes {
            graph.insert(node);
        }
        graph.link_parents();
        graph
    }

    #[test]
    fn test_single_parent_chain_reduces_to_root() {
        let mut graph = graph(vec![
            branch(0, "a", 5, 40),
            branch(5, "b", 41, 42),
            leaf(40, ResolvedValue::BooleanFalse),
            leaf(41, ResolvedValue::BooleanTrue),
            leaf(42, ResolvedValue::BooleanFalse),
        ]);
        assert_eq!(graph.non_boolean_count(), 2);
        graph.reduce().unwrap();
        assert_eq!(graph.len(), 1);
        insta::assert_snapshot!(graph.finalize().unwrap(), @"a and b");
    }

    #[test]
    fn test_diamond_stalls() {
        let mut graph = graph(vec![
            branch(0, "a", 10, 20),
            branch(10, "b", 30, 99),
            branch(20, "c", 30, 99),
            branch(30, "d", 98, 99),
            leaf(98, ResolvedValue::BooleanTrue),
            leaf(99, ResolvedValue::BooleanFalse),
        ]);
        assert_eq!(
            graph.reduce(),
            Err(InconclusiveReason::Stalled { remaining: 4 })
        );
        // Nothing was folded.
        assert_eq!(graph.len(), 6);
    }

    #[test]
    fn test_shared_false_successor_is_and() {
        let mut graph = graph(vec![
            branch(1, "a == 1", 3, 8),
            branch(3, "b == 2", 6, 8),
            leaf(6, ResolvedValue::BooleanTrue),
            leaf(8, ResolvedValue::BooleanFalse),
        ]);
        assert!(!graph.analyse(1), "the root has no parent");
        assert!(graph.analyse(3));
        assert!(!graph.contains(3));
        assert_eq!(graph.get(1).unwrap().successors(), Some((6, 8)));
        assert_eq!(graph.get(6).unwrap().parents.len(), 1);
        assert!(graph.get(8).unwrap().parents.contains(&1));
        insta::assert_snapshot!(graph.finalize().unwrap(), @"a == 1 and b == 2");
    }

    #[test]
    fn test_shared_true_successor_is_or() {
        let mut graph = graph(vec![
            branch(1, "a == 1", 7, 3),
            branch(3, "b == 2", 7, 6),
            leaf(6, ResolvedValue::BooleanFalse),
            leaf(7, ResolvedValue::BooleanTrue),
        ]);
        graph.reduce().unwrap();
        insta::assert_snapshot!(graph.finalize().unwrap(), @"a == 1 or b == 2");
    }

    #[test]
    fn test_mixed_chain_parenthesizes() {
        // (a or b) and c
        let mut graph = graph(vec![
            branch(1, "a", 6, 3),
            branch(3, "b", 6, 9),
            branch(6, "c", 10, 9),
            leaf(9, ResolvedValue::BooleanFalse),
            leaf(10, ResolvedValue::BooleanTrue),
        ]);
        graph.reduce().unwrap();
        insta::assert_snapshot!(graph.finalize().unwrap(), @"(a or b) and c");
    }

    #[test]
    fn test_value_leaves_fold_into_parent() {
        // x = a and b or c
        let mut graph = graph(vec![
            branch(1, "a", 3, 6),
            branch(3, "b", 7, 6),
            leaf(6, ResolvedValue::Generic("c".into())),
            leaf(7, ResolvedValue::Nil),
        ]);
        graph.reduce().unwrap();
        assert_eq!(graph.len(), 1);
        insta::assert_snapshot!(graph.finalize().unwrap(), @"(a and b) or c");
    }

    #[test]
    fn test_true_other_successor_reverses_parent() {
        // P false -> true, P true -> N: `not P or N`
        let mut graph = graph(vec![
            branch(0, "x == 1", 2, 9),
            leaf(2, ResolvedValue::Generic("y".into())),
            leaf(9, ResolvedValue::BooleanTrue),
        ]);
        assert!(graph.analyse(2));
        assert_eq!(graph.len(), 1);
        insta::assert_snapshot!(graph.finalize().unwrap(), @"x ~= 1 or y");
    }

    #[test]
    fn test_generic_other_successor_blocks_fold() {
        let mut graph = graph(vec![
            branch(0, "a", 2, 4),
            leaf(2, ResolvedValue::Generic("b".into())),
            leaf(4, ResolvedValue::Generic("c".into())),
        ]);
        assert!(!graph.analyse(2));
        assert!(!graph.analyse(4));
        assert_eq!(
            graph.reduce(),
            Err(InconclusiveReason::Stalled { remaining: 3 })
        );
    }

    #[test]
    fn test_finalize_reverses_inverted_root() {
        let graph = graph(vec![
            branch(1, "a == 1", 3, 4),
            leaf(3, ResolvedValue::BooleanFalse),
            leaf(4, ResolvedValue::BooleanTrue),
        ]);
        assert_eq!(graph.targets(), vec![3, 4]);
        insta::assert_snapshot!(graph.finalize().unwrap(), @"a ~= 1");
    }

    #[test]
    fn test_orphans_are_removed() {
        let mut graph = graph(vec![
            branch(0, "a", 2, 3),
            leaf(2, ResolvedValue::BooleanTrue),
            leaf(3, ResolvedValue::BooleanFalse),
            leaf(7, ResolvedValue::Nil),
        ]);
        graph.remove_orphans();
        assert!(!graph.contains(7));
        assert!(graph.contains(0));
        assert_eq!(graph.len(), 3);
    }
}
