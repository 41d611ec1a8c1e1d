use crate::types::{NodeId, UserId};
use serde::Serialize;
use std::fmt;

/// Why a lock request was refused.
///
/// Refusals are ordinary outcomes, not errors: the boolean operations map
/// every `Rejection` to `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rejection {
    /// The target is already locked
    AlreadyLocked {
        /// Current holder of the target
        owner: UserId,
    },
    /// An ancestor of the target holds a lock
    AncestorLocked {
        /// Nearest locked ancestor
        ancestor: NodeId,
    },
    /// At least one descendant of the target holds a lock
    DescendantLocked {
        /// Number of locked descendants
        count: usize,
    },
    /// Unlock on a node nobody holds
    NotLocked,
    /// Unlock by a user other than the holder
    NotOwner {
        /// Actual holder
        owner: UserId,
    },
    /// Upgrade on a node with no locked descendants
    NothingToUpgrade,
    /// Upgrade blocked by a descendant held by another user
    ForeignDescendant {
        /// First foreign-held descendant found
        node: NodeId,
        /// Its holder
        owner: UserId,
    },
}

impl Rejection {
    /// Short stable label for stats and logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Rejection::AlreadyLocked { .. } => "already_locked",
            Rejection::AncestorLocked { .. } => "ancestor_locked",
            Rejection::DescendantLocked { .. } => "descendant_locked",
            Rejection::NotLocked => "not_locked",
            Rejection::NotOwner { .. } => "not_owner",
            Rejection::NothingToUpgrade => "nothing_to_upgrade",
            Rejection::ForeignDescendant { .. } => "foreign_descendant",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::AlreadyLocked { owner } => write!(f, "already locked by {owner}"),
            Rejection::AncestorLocked { ancestor } => write!(f, "ancestor {ancestor} is locked"),
            Rejection::DescendantLocked { count } => write!(f, "{count} descendant(s) locked"),
            Rejection::NotLocked => f.write_str("not locked"),
            Rejection::NotOwner { owner } => write!(f, "locked by {owner}"),
            Rejection::NothingToUpgrade => f.write_str("no locked descendants"),
            Rejection::ForeignDescendant { node, owner } => {
                write!(f, "descendant {node} locked by {owner}")
            }
        }
    }
}
