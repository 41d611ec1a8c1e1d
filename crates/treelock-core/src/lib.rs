//! Treelock core
//!
//! Exclusive locking over the nodes of a static m-ary tree. A node can be
//! locked by one user at a time, never while an ancestor or descendant is
//! locked, and a user's descendant locks can be upgraded into a single lock
//! on a common ancestor.
//!
//! # Quick Start
//!
//! ```rust
//! use treelock_core::prelude::*;
//!
//! let mut engine = LockEngine::from_names(["0", "1", "2", "3", "4", "5", "6"], 2)?;
//! let uid = UserId(1);
//!
//! assert!(engine.lock_by_name("4", uid)?);
//! assert!(!engine.lock_by_name("1", uid)?); // "1" is an ancestor of "4"
//! assert!(engine.upgrade_by_name("1", uid)?);
//! assert_eq!(engine.locked_by(engine.tree().lookup("1")?), Some(uid));
//! # Ok::<(), treelock_core::TreeError>(())
//! ```

// Core modules
pub mod engine;
pub mod error;
pub mod invariants;
pub mod sync;
pub mod tree;
pub mod types;

// Harness
pub mod config;
pub mod query;

// Test harness
pub mod test_harness;

// Re-exports
pub use error::*;
pub use types::*;

/// Common imports
pub mod prelude {
    pub use crate::config::HarnessConfig;
    pub use crate::engine::{LockEngine, LockState, Rejection};
    pub use crate::error::{ConfigError, QueryError, TreeError, TreeLockError};
    pub use crate::sync::SharedLockTree;
    pub use crate::tree::Tree;
    pub use crate::types::{NodeId, Operation, UserId};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if running with strict debugging enabled
#[must_use]
pub const fn strict_debug() -> bool {
    cfg!(feature = "strict-debug")
}
