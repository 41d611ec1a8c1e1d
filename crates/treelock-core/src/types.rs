//! Core identifiers shared by the tree, the lock engine and the harness.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena handle for a node in a [`Tree`](crate::tree::Tree).
///
/// Handles are construction-order indices: the root is always `NodeId(0)`
/// and node `i` has parent `(i - 1) / arity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root of every tree
    pub const ROOT: Self = Self(0);

    /// Raw arena index
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of the logical user requesting a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid:{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// The three lock operations understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Acquire an exclusive lock on a node
    Lock,
    /// Release a lock held by the requesting user
    Unlock,
    /// Replace all of a user's descendant locks with one lock on the node
    Upgrade,
}

impl Operation {
    /// All operations, in opcode order
    pub const ALL: [Operation; 3] = [Operation::Lock, Operation::Unlock, Operation::Upgrade];

    /// Lowercase name used in logs and reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Lock => "lock",
            Operation::Unlock => "unlock",
            Operation::Upgrade => "upgrade",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
