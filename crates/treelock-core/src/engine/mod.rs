//! Lock engine
//!
//! Implements Lock, Unlock and Upgrade over a shared [`Tree`]. Every node
//! carries a cached count of locked strict descendants, maintained
//! incrementally along the ancestor chain, so:
//!
//! - Lock and Unlock cost O(depth)
//! - Upgrade costs O(depth) plus a pruned sweep of the target's subtree
//!
//! Each operation validates all of its preconditions before touching any
//! state. A refused request returns `false` and leaves the engine unchanged.

mod rejection;
mod state;

pub use rejection::Rejection;
pub use state::LockState;

use crate::error::TreeError;
use crate::tree::Tree;
use crate::types::{NodeId, Operation, UserId};
use std::sync::Arc;

/// Single-threaded lock engine over one tree.
#[derive(Debug, Clone)]
pub struct LockEngine {
    tree: Arc<Tree>,
    state: LockState,
}

impl LockEngine {
    /// Create an engine with every node unlocked
    #[must_use]
    pub fn new(tree: impl Into<Arc<Tree>>) -> Self {
        let tree = tree.into();
        let state = LockState::new(tree.len());
        Self { tree, state }
    }

    /// Build the tree and the engine in one step
    ///
    /// # Errors
    /// Propagates construction errors from [`Tree::build`].
    pub fn from_names<I, S>(names: I, arity: usize) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(Tree::build(names, arity)?))
    }

    /// The underlying tree shape
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Shared handle to the tree shape
    #[inline]
    #[must_use]
    pub fn shared_tree(&self) -> Arc<Tree> {
        Arc::clone(&self.tree)
    }

    /// Read-only view of the lock state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &LockState {
        &self.state
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether `node` is currently locked
    #[inline]
    #[must_use]
    pub fn is_locked(&self, node: NodeId) -> bool {
        self.state.owner(node).is_some()
    }

    /// Holder of the lock on `node`
    #[inline]
    #[must_use]
    pub fn locked_by(&self, node: NodeId) -> Option<UserId> {
        self.state.owner(node)
    }

    /// Cached number of locked nodes strictly below `node`
    #[inline]
    #[must_use]
    pub fn locked_descendant_count(&self, node: NodeId) -> usize {
        self.state.locked_descendants(node)
    }

    /// Currently locked nodes with their holders
    pub fn locked_nodes(&self) -> impl Iterator<Item = (NodeId, UserId)> + '_ {
        self.state.locked()
    }

    /// Number of locked nodes in the tree
    #[inline]
    #[must_use]
    pub fn locked_count(&self) -> usize {
        self.state.locked_total()
    }

    // ------------------------------------------------------------------
    // Validation (side-effect free)
    // ------------------------------------------------------------------

    /// Check whether `lock(node, uid)` would succeed
    ///
    /// # Errors
    /// The first failed precondition, in the order: self, ancestors,
    /// descendants.
    pub fn check_lock(&self, node: NodeId, _uid: UserId) -> Result<(), Rejection> {
        if let Some(owner) = self.state.owner(node) {
            return Err(Rejection::AlreadyLocked { owner });
        }
        if let Some(ancestor) = self.locked_ancestor(node) {
            return Err(Rejection::AncestorLocked { ancestor });
        }
        match self.state.locked_descendants(node) {
            0 => Ok(()),
            count => Err(Rejection::DescendantLocked { count }),
        }
    }

    /// Check whether `unlock(node, uid)` would succeed
    ///
    /// # Errors
    /// [`Rejection::NotLocked`] or [`Rejection::NotOwner`].
    pub fn check_unlock(&self, node: NodeId, uid: UserId) -> Result<(), Rejection> {
        match self.state.owner(node) {
            None => Err(Rejection::NotLocked),
            Some(owner) if owner != uid => Err(Rejection::NotOwner { owner }),
            Some(_) => Ok(()),
        }
    }

    /// Check whether `upgrade(node, uid)` would succeed
    ///
    /// # Errors
    /// [`Rejection::AlreadyLocked`], [`Rejection::NothingToUpgrade`] or
    /// [`Rejection::ForeignDescendant`].
    pub fn check_upgrade(&self, node: NodeId, uid: UserId) -> Result<(), Rejection> {
        self.plan_upgrade(node, uid).map(|_| ())
    }

    /// Dispatch to the `check_*` method for `op`
    ///
    /// # Errors
    /// The rejection the corresponding operation would produce.
    pub fn check(&self, op: Operation, node: NodeId, uid: UserId) -> Result<(), Rejection> {
        match op {
            Operation::Lock => self.check_lock(node, uid),
            Operation::Unlock => self.check_unlock(node, uid),
            Operation::Upgrade => self.check_upgrade(node, uid),
        }
    }

    /// Nearest locked strict ancestor, if any
    fn locked_ancestor(&self, node: NodeId) -> Option<NodeId> {
        self.tree
            .ancestors_of(node)
            .find(|a| self.state.owner(*a).is_some())
    }

    /// Validate an upgrade and collect the descendant locks it would release.
    fn plan_upgrade(&self, node: NodeId, uid: UserId) -> Result<Vec<NodeId>, Rejection> {
        if let Some(owner) = self.state.owner(node) {
            return Err(Rejection::AlreadyLocked { owner });
        }
        let expected = self.state.locked_descendants(node);
        if expected == 0 {
            return Err(Rejection::NothingToUpgrade);
        }

        // Only descend into children that are locked or hide locks below
        // them. A locked node's own subtree is empty of locks, so the sweep
        // stops there.
        let mut held = Vec::with_capacity(expected);
        let mut stack: Vec<NodeId> = self.tree.children(node).to_vec();
        while let Some(current) = stack.pop() {
            if let Some(owner) = self.state.owner(current) {
                if owner != uid {
                    return Err(Rejection::ForeignDescendant {
                        node: current,
                        owner,
                    });
                }
                held.push(current);
                continue;
            }
            stack.extend(
                self.tree
                    .children(current)
                    .iter()
                    .filter(|c| {
                        self.state.owner(**c).is_some() || self.state.locked_descendants(**c) > 0
                    }),
            );
        }

        debug_assert_eq!(held.len(), expected, "cached count disagrees with sweep");
        Ok(held)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Lock `node` for `uid`.
    ///
    /// Fails if the node, any ancestor, or any descendant is already locked.
    pub fn lock(&mut self, node: NodeId, uid: UserId) -> bool {
        match self.check_lock(node, uid) {
            Ok(()) => {
                self.acquire(node, uid);
                self.after_mutation(Operation::Lock, node, uid);
                true
            }
            Err(rejection) => self.refuse(Operation::Lock, node, uid, rejection),
        }
    }

    /// Unlock `node`, which must be held by `uid`.
    pub fn unlock(&mut self, node: NodeId, uid: UserId) -> bool {
        match self.check_unlock(node, uid) {
            Ok(()) => {
                self.release(node);
                self.after_mutation(Operation::Unlock, node, uid);
                true
            }
            Err(rejection) => self.refuse(Operation::Unlock, node, uid, rejection),
        }
    }

    /// Replace every lock `uid` holds below `node` with a single lock on
    /// `node`.
    ///
    /// Fails without any change if `node` is locked, has no locked
    /// descendants, or any locked descendant belongs to another user.
    pub fn upgrade(&mut self, node: NodeId, uid: UserId) -> bool {
        match self.plan_upgrade(node, uid) {
            Ok(held) => {
                let released = held.len();
                for descendant in held {
                    self.release(descendant);
                }
                self.acquire(node, uid);
                tracing::trace!(
                    node = self.tree.name(node),
                    %uid,
                    released,
                    "upgraded descendant locks"
                );
                self.after_mutation(Operation::Upgrade, node, uid);
                true
            }
            Err(rejection) => self.refuse(Operation::Upgrade, node, uid, rejection),
        }
    }

    /// Dispatch `op` on a resolved node
    pub fn apply(&mut self, op: Operation, node: NodeId, uid: UserId) -> bool {
        match op {
            Operation::Lock => self.lock(node, uid),
            Operation::Unlock => self.unlock(node, uid),
            Operation::Upgrade => self.upgrade(node, uid),
        }
    }

    /// [`lock`](Self::lock) by node name
    ///
    /// # Errors
    /// [`TreeError::UnknownNode`] if the name is not in the tree.
    pub fn lock_by_name(&mut self, name: &str, uid: UserId) -> Result<bool, TreeError> {
        self.apply_by_name(Operation::Lock, name, uid)
    }

    /// [`unlock`](Self::unlock) by node name
    ///
    /// # Errors
    /// [`TreeError::UnknownNode`] if the name is not in the tree.
    pub fn unlock_by_name(&mut self, name: &str, uid: UserId) -> Result<bool, TreeError> {
        self.apply_by_name(Operation::Unlock, name, uid)
    }

    /// [`upgrade`](Self::upgrade) by node name
    ///
    /// # Errors
    /// [`TreeError::UnknownNode`] if the name is not in the tree.
    pub fn upgrade_by_name(&mut self, name: &str, uid: UserId) -> Result<bool, TreeError> {
        self.apply_by_name(Operation::Upgrade, name, uid)
    }

    /// [`apply`](Self::apply) by node name
    ///
    /// # Errors
    /// [`TreeError::UnknownNode`] if the name is not in the tree.
    pub fn apply_by_name(
        &mut self,
        op: Operation,
        name: &str,
        uid: UserId,
    ) -> Result<bool, TreeError> {
        let node = self.tree.lookup(name)?;
        Ok(self.apply(op, node, uid))
    }

    /// Drop every lock
    pub fn reset(&mut self) {
        self.state.clear();
    }

    fn acquire(&mut self, node: NodeId, uid: UserId) {
        self.state.set_owner(node, uid);
        for ancestor in self.tree.ancestors_of(node) {
            self.state.increment(ancestor);
        }
    }

    fn release(&mut self, node: NodeId) {
        self.state.clear_owner(node);
        for ancestor in self.tree.ancestors_of(node) {
            self.state.decrement(ancestor);
        }
    }

    fn refuse(&self, op: Operation, node: NodeId, uid: UserId, rejection: Rejection) -> bool {
        tracing::debug!(
            %op,
            node = self.tree.name(node),
            %uid,
            reason = rejection.label(),
            "request refused: {rejection}"
        );
        false
    }

    fn after_mutation(&self, op: Operation, node: NodeId, uid: UserId) {
        tracing::trace!(%op, node = self.tree.name(node), %uid, "granted");

        #[cfg(feature = "strict-debug")]
        {
            let violations = crate::invariants::check_engine(self);
            assert!(
                violations.is_empty(),
                "invariants broken after {op} on {node}: {violations:?}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U1: UserId = UserId(1);
    const U2: UserId = UserId(2);

    fn engine() -> LockEngine {
        LockEngine::from_names(["0", "1", "2", "3", "4", "5", "6"], 2).unwrap()
    }

    #[test]
    fn lock_updates_ancestor_counters() {
        let mut e = engine();
        assert!(e.lock(NodeId(4), U1));
        assert_eq!(e.locked_by(NodeId(4)), Some(U1));
        assert_eq!(e.locked_descendant_count(NodeId(1)), 1);
        assert_eq!(e.locked_descendant_count(NodeId(0)), 1);
        assert_eq!(e.locked_descendant_count(NodeId(2)), 0);
        assert_eq!(e.locked_count(), 1);
    }

    #[test]
    fn lock_rejections_in_order() {
        let mut e = engine();
        assert!(e.lock(NodeId(1), U1));

        assert_eq!(
            e.check_lock(NodeId(1), U2),
            Err(Rejection::AlreadyLocked { owner: U1 })
        );
        assert_eq!(
            e.check_lock(NodeId(3), U2),
            Err(Rejection::AncestorLocked { ancestor: NodeId(1) })
        );
        assert_eq!(
            e.check_lock(NodeId(0), U2),
            Err(Rejection::DescendantLocked { count: 1 })
        );
        assert_eq!(e.check_lock(NodeId(2), U2), Ok(()));
    }

    #[test]
    fn unlock_requires_owner() {
        let mut e = engine();
        assert_eq!(e.check_unlock(NodeId(3), U1), Err(Rejection::NotLocked));
        assert!(e.lock(NodeId(3), U1));
        assert!(!e.unlock(NodeId(3), U2));
        assert_eq!(e.locked_by(NodeId(3)), Some(U1));
        assert!(e.unlock(NodeId(3), U1));
        assert!(!e.is_locked(NodeId(3)));
        assert_eq!(e.locked_descendant_count(NodeId(0)), 0);
    }

    #[test]
    fn upgrade_collects_all_descendants() {
        let mut e = engine();
        assert!(e.lock(NodeId(3), U1));
        assert!(e.lock(NodeId(4), U1));
        assert!(e.lock(NodeId(6), U1));

        assert!(e.upgrade(NodeId(0), U1));
        assert_eq!(e.locked_nodes().collect::<Vec<_>>(), vec![(NodeId(0), U1)]);
        for node in e.tree().nodes() {
            assert_eq!(e.locked_descendant_count(node), 0);
        }
    }

    #[test]
    fn upgrade_keeps_outer_counters_consistent() {
        let mut e = engine();
        assert!(e.lock(NodeId(3), U1));
        assert!(e.lock(NodeId(4), U1));
        assert!(e.lock(NodeId(5), U2));

        assert!(e.upgrade(NodeId(1), U1));
        assert_eq!(e.locked_by(NodeId(1)), Some(U1));
        assert_eq!(e.locked_descendant_count(NodeId(1)), 0);
        // root sees node 1 and node 5
        assert_eq!(e.locked_descendant_count(NodeId(0)), 2);
    }

    #[test]
    fn upgrade_rejections() {
        let mut e = engine();
        assert_eq!(e.check_upgrade(NodeId(1), U1), Err(Rejection::NothingToUpgrade));

        assert!(e.lock(NodeId(3), U1));
        assert!(e.lock(NodeId(4), U2));
        assert!(matches!(
            e.check_upgrade(NodeId(1), U1),
            Err(Rejection::ForeignDescendant { owner: U2, .. })
        ));
        assert!(!e.upgrade(NodeId(1), U1));
        assert_eq!(e.locked_by(NodeId(3)), Some(U1));
        assert_eq!(e.locked_by(NodeId(4)), Some(U2));
        assert_eq!(e.locked_descendant_count(NodeId(1)), 2);

        assert!(e.lock(NodeId(5), U1));
        assert!(e.unlock(NodeId(5), U1));
        assert!(e.lock(NodeId(2), U1));
        assert_eq!(
            e.check_upgrade(NodeId(2), U1),
            Err(Rejection::AlreadyLocked { owner: U1 })
        );
    }

    #[test]
    fn by_name_rejects_unknown_nodes() {
        let mut e = engine();
        assert_eq!(
            e.lock_by_name("missing", U1),
            Err(TreeError::UnknownNode("missing".into()))
        );
        assert_eq!(e.lock_by_name("2", U1), Ok(true));
        assert_eq!(e.upgrade_by_name("0", U1), Ok(true));
        assert_eq!(e.unlock_by_name("0", U1), Ok(true));
    }

    #[test]
    fn reset_clears_everything() {
        let mut e = engine();
        assert!(e.lock(NodeId(5), U1));
        assert!(e.lock(NodeId(3), U2));
        e.reset();
        assert_eq!(e.locked_count(), 0);
        assert_eq!(e.locked_descendant_count(NodeId(0)), 0);
        assert!(e.lock(NodeId(0), U1));
    }
}
