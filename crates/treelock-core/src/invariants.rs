//! Brute-force invariant checks
//!
//! Recomputes everything the engine caches from first principles. Intended
//! for tests, the simulator and the harness's verify mode; cost is
//! O(nodes * depth).

use crate::engine::LockEngine;
use crate::types::{NodeId, Operation, UserId};
use serde::Serialize;
use std::fmt;

/// Which invariant a violation concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InvariantCheck {
    /// No locked node has a locked ancestor
    LockedSetIsAntichain,
    /// Cached locked-descendant counts match a subtree scan
    DescendantCountsMatch,
    /// The engine's locked total matches the number of owned nodes
    LockedTotalMatches,
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Failed invariant
    pub check: InvariantCheck,
    /// Node the failure was observed at
    pub node: NodeId,
    /// Human readable detail
    pub details: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}: {}", self.check, self.node, self.details)
    }
}

/// Run every check against the engine's current state
#[must_use]
pub fn check_engine(engine: &LockEngine) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    check_antichain(engine, &mut violations);
    check_descendant_counts(engine, &mut violations);
    check_locked_total(engine, &mut violations);
    violations
}

/// Number of locked nodes strictly below `node`, counted by scanning
#[must_use]
pub fn count_locked_below(engine: &LockEngine, node: NodeId) -> usize {
    engine
        .tree()
        .subtree_of(node)
        .filter(|d| engine.is_locked(*d))
        .count()
}

/// Outcome `op` should have, decided by scanning rather than by the
/// engine's cached counters
#[must_use]
pub fn reference_outcome(engine: &LockEngine, op: Operation, node: NodeId, uid: UserId) -> bool {
    let tree = engine.tree();
    match op {
        Operation::Lock => {
            !engine.is_locked(node)
                && !tree.ancestors_of(node).any(|a| engine.is_locked(a))
                && !tree.subtree_of(node).any(|d| engine.is_locked(d))
        }
        Operation::Unlock => engine.locked_by(node) == Some(uid),
        Operation::Upgrade => {
            let owners: Vec<UserId> = tree
                .subtree_of(node)
                .filter_map(|d| engine.locked_by(d))
                .collect();
            !engine.is_locked(node) && !owners.is_empty() && owners.iter().all(|o| *o == uid)
        }
    }
}

fn check_antichain(engine: &LockEngine, out: &mut Vec<InvariantViolation>) {
    let tree = engine.tree();
    for (node, _) in engine.locked_nodes() {
        if let Some(ancestor) = tree.ancestors_of(node).find(|a| engine.is_locked(*a)) {
            out.push(InvariantViolation {
                check: InvariantCheck::LockedSetIsAntichain,
                node,
                details: format!(
                    "'{}' and its ancestor '{}' are both locked",
                    tree.name(node),
                    tree.name(ancestor)
                ),
            });
        }
    }
}

fn check_descendant_counts(engine: &LockEngine, out: &mut Vec<InvariantViolation>) {
    let tree = engine.tree();
    for node in tree.nodes() {
        let cached = engine.locked_descendant_count(node);
        let actual = count_locked_below(engine, node);
        if cached != actual {
            out.push(InvariantViolation {
                check: InvariantCheck::DescendantCountsMatch,
                node,
                details: format!(
                    "'{}' caches {cached} locked descendant(s), scan found {actual}",
                    tree.name(node)
                ),
            });
        }
    }
}

fn check_locked_total(engine: &LockEngine, out: &mut Vec<InvariantViolation>) {
    let owned = engine.locked_nodes().count();
    if owned != engine.locked_count() {
        out.push(InvariantViolation {
            check: InvariantCheck::LockedTotalMatches,
            node: engine.tree().root(),
            details: format!(
                "engine reports {} locked node(s), {owned} have owners",
                engine.locked_count()
            ),
        });
    }
}
