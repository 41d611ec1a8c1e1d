//! Testing utilities for the treelock workspace
//!
//! Shared fixtures and assertions.

#![allow(missing_docs)]

use treelock_core::engine::LockEngine;
use treelock_core::invariants;
use treelock_core::tree::Tree;
use treelock_core::types::NodeId;

/// Names `"0"`, `"1"`, ... `"{n-1}"`
pub fn numbered_names(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

/// `0 -> {1, 2}`, `1 -> {3, 4}`, `2 -> {5, 6}`
pub fn binary_tree_7() -> Tree {
    Tree::build(numbered_names(7), 2).unwrap()
}

/// Arity-1 tree: every node has exactly one child except the last
pub fn chain(len: usize) -> Tree {
    Tree::build(numbered_names(len), 1).unwrap()
}

/// Root with `width` leaf children
pub fn wide_tree(width: usize) -> Tree {
    Tree::build(numbered_names(width + 1), width.max(1)).unwrap()
}

pub fn engine_for(tree: Tree) -> LockEngine {
    LockEngine::new(tree)
}

/// Resolve a fixture node by name
pub fn node(engine: &LockEngine, name: &str) -> NodeId {
    engine.tree().lookup(name).unwrap()
}

/// Panic with every violation if any invariant is broken
pub fn assert_invariants(engine: &LockEngine) {
    let violations = invariants::check_engine(engine);
    assert!(
        violations.is_empty(),
        "invariant violations:\n{}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Locked set as sorted `(name, uid)` pairs, for readable assertions
pub fn locked_names(engine: &LockEngine) -> Vec<(String, i64)> {
    let mut locked: Vec<_> = engine
        .locked_nodes()
        .map(|(node, uid)| (engine.tree().name(node).to_string(), uid.0))
        .collect();
    locked.sort();
    locked
}
