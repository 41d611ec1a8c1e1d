//! Thread-safe handle over a [`LockEngine`]
//!
//! The cached descendant counters are only consistent between whole
//! operations, so every Lock/Unlock/Upgrade runs under one mutex per tree.
//! Name resolution reads the immutable [`Tree`] directly and never takes
//! the mutex.

use crate::engine::{LockEngine, LockState};
use crate::error::TreeError;
use crate::tree::Tree;
use crate::types::{NodeId, Operation, UserId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable, `Send + Sync` handle to one lock tree.
#[derive(Debug, Clone)]
pub struct SharedLockTree {
    tree: Arc<Tree>,
    engine: Arc<Mutex<LockEngine>>,
}

impl SharedLockTree {
    /// Wrap a fresh engine over `tree`
    #[must_use]
    pub fn new(tree: impl Into<Arc<Tree>>) -> Self {
        Self::from_engine(LockEngine::new(tree))
    }

    /// Wrap an existing engine, keeping its current locks
    #[must_use]
    pub fn from_engine(engine: LockEngine) -> Self {
        Self {
            tree: engine.shared_tree(),
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// The immutable tree shape (no locking)
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Apply `op` atomically
    pub fn apply(&self, op: Operation, node: NodeId, uid: UserId) -> bool {
        self.engine.lock().apply(op, node, uid)
    }

    /// Atomic [`LockEngine::lock`]
    pub fn lock(&self, node: NodeId, uid: UserId) -> bool {
        self.apply(Operation::Lock, node, uid)
    }

    /// Atomic [`LockEngine::unlock`]
    pub fn unlock(&self, node: NodeId, uid: UserId) -> bool {
        self.apply(Operation::Unlock, node, uid)
    }

    /// Atomic [`LockEngine::upgrade`]
    pub fn upgrade(&self, node: NodeId, uid: UserId) -> bool {
        self.apply(Operation::Upgrade, node, uid)
    }

    /// Resolve `name` and apply `op` atomically
    ///
    /// # Errors
    /// [`TreeError::UnknownNode`] if the name is not in the tree.
    pub fn apply_by_name(&self, op: Operation, name: &str, uid: UserId) -> Result<bool, TreeError> {
        let node = self.tree.lookup(name)?;
        Ok(self.apply(op, node, uid))
    }

    /// Run a read-only closure against a consistent view of the engine
    pub fn inspect<R>(&self, f: impl FnOnce(&LockEngine) -> R) -> R {
        f(&self.engine.lock())
    }

    /// Copy of the current lock state
    #[must_use]
    pub fn snapshot(&self) -> LockState {
        self.engine.lock().state().clone()
    }

    /// Unwrap the engine if this is the last handle
    ///
    /// # Errors
    /// Returns `self` unchanged while other clones are alive.
    pub fn try_into_engine(self) -> Result<LockEngine, Self> {
        let tree = self.tree;
        Arc::try_unwrap(self.engine)
            .map(Mutex::into_inner)
            .map_err(|engine| Self { tree, engine })
    }
}
