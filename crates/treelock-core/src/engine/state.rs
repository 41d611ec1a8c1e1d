//! Per-node mutable lock state

use crate::types::{NodeId, UserId};

/// Lock owner and cached locked-descendant count for every node.
///
/// `is_locked` is not stored: a node is locked exactly when it has an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockState {
    owners: Vec<Option<UserId>>,
    locked_descendants: Vec<usize>,
    locked_total: usize,
}

impl LockState {
    /// All nodes unlocked
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            owners: vec![None; len],
            locked_descendants: vec![0; len],
            locked_total: 0,
        }
    }

    /// Current owner of a node
    #[inline]
    #[must_use]
    pub fn owner(&self, node: NodeId) -> Option<UserId> {
        self.owners[node.0]
    }

    /// Cached number of locked nodes strictly below `node`
    #[inline]
    #[must_use]
    pub fn locked_descendants(&self, node: NodeId) -> usize {
        self.locked_descendants[node.0]
    }

    /// Number of locked nodes in the whole tree
    #[inline]
    #[must_use]
    pub fn locked_total(&self) -> usize {
        self.locked_total
    }

    /// Locked nodes with their owners, in arena order
    pub fn locked(&self) -> impl Iterator<Item = (NodeId, UserId)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(i, owner)| owner.map(|uid| (NodeId(i), uid)))
    }

    pub(super) fn set_owner(&mut self, node: NodeId, uid: UserId) {
        debug_assert!(self.owners[node.0].is_none(), "node {node} already owned");
        self.owners[node.0] = Some(uid);
        self.locked_total += 1;
    }

    pub(super) fn clear_owner(&mut self, node: NodeId) {
        debug_assert!(self.owners[node.0].is_some(), "node {node} not owned");
        self.owners[node.0] = None;
        self.locked_total -= 1;
    }

    pub(super) fn increment(&mut self, node: NodeId) {
        self.locked_descendants[node.0] += 1;
    }

    pub(super) fn decrement(&mut self, node: NodeId) {
        debug_assert!(self.locked_descendants[node.0] > 0, "counter underflow at {node}");
        self.locked_descendants[node.0] -= 1;
    }

    pub(super) fn clear(&mut self) {
        self.owners.fill(None);
        self.locked_descendants.fill(0);
        self.locked_total = 0;
    }
}
