//! Lazy traversals over a [`Tree`]

use super::Tree;
use crate::types::NodeId;
use std::iter::FusedIterator;

/// Walks from a node's parent up to the root.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Ancestors<'a> {
    pub(super) fn new(tree: &'a Tree, node: NodeId) -> Self {
        Self {
            tree,
            next: tree.parent(node),
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

impl FusedIterator for Ancestors<'_> {}

/// Pre-order walk of a node's strict descendants.
///
/// Uses a heap-allocated stack so deep chains (arity 1) cannot overflow the
/// call stack.
#[derive(Debug, Clone)]
pub struct Subtree<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Subtree<'a> {
    pub(super) fn new(tree: &'a Tree, node: NodeId) -> Self {
        let mut stack = Vec::with_capacity(tree.arity());
        stack.extend(tree.children(node).iter().rev());
        Self { tree, stack }
    }
}

impl Iterator for Subtree<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack.extend(self.tree.children(current).iter().rev());
        Some(current)
    }
}

impl FusedIterator for Subtree<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtree_preorder() {
        let tree = Tree::build(["r", "a", "b", "c", "d", "e", "f"], 2).unwrap();
        let order: Vec<_> = tree.subtree_of(NodeId(0)).map(|n| tree.name(n)).collect();
        assert_eq!(order, vec!["a", "c", "d", "b", "e", "f"]);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let names: Vec<String> = (0..50_000).map(|i| format!("n{i}")).collect();
        let tree = Tree::build(names, 1).unwrap();
        assert_eq!(tree.subtree_of(NodeId(0)).count(), 49_999);
        assert_eq!(tree.ancestors_of(NodeId(49_999)).count(), 49_999);
    }
}
