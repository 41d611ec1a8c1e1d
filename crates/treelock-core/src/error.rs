//! Error types for treelock
//!
//! Only contract violations are errors. A lock request that is refused is an
//! expected outcome and is reported as `false` (see [`Rejection`](crate::engine::Rejection)).

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum TreeLockError {
    /// Tree construction or lookup failed
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Query input could not be parsed
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Harness configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Post-operation invariant check failed
    #[error("invariant violated after query {query_index}: {details}")]
    InvariantViolated {
        /// Zero-based index of the offending query
        query_index: usize,
        /// Human readable description of the first violation
        details: String,
    },
}

impl TreeLockError {
    /// Whether the caller can continue with the same tree after this error
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            TreeLockError::Tree(e) => !e.is_configuration_error(),
            TreeLockError::Query(_) | TreeLockError::Config(_) => false,
            TreeLockError::InvariantViolated { .. } => false,
        }
    }
}

/// Tree construction and lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// No node carries the requested name
    #[error("unknown node: '{0}'")]
    UnknownNode(String),

    /// A name appears more than once in the construction list
    #[error("duplicate node name: '{0}'")]
    DuplicateName(String),

    /// Arity must be at least one
    #[error("invalid arity: {0} (must be >= 1)")]
    InvalidArity(usize),

    /// A tree needs at least a root
    #[error("cannot build a tree without nodes")]
    EmptyTree,
}

impl TreeError {
    /// Construction-time errors (the `InvalidConfiguration` class)
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            TreeError::DuplicateName(_) | TreeError::InvalidArity(_) | TreeError::EmptyTree
        )
    }
}

/// Errors in the textual query stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Input ended before an expected token
    #[error("unexpected end of input while reading {expected}")]
    UnexpectedEof {
        /// What the parser was looking for
        expected: &'static str,
    },

    /// A token could not be parsed as a number
    #[error("invalid {field} '{token}'")]
    InvalidNumber {
        /// Header or record field being parsed
        field: &'static str,
        /// Offending token
        token: String,
    },

    /// Opcode outside {1, 2, 3}
    #[error("unknown opcode {0}")]
    UnknownOpcode(i64),

    /// Tokens remained after the declared number of queries
    #[error("{0} trailing token(s) after the last query")]
    TrailingInput(usize),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`HarnessConfig`](crate::config::HarnessConfig)
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The log filter directive is empty
    #[error("log filter must not be empty")]
    EmptyLogFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_errors_are_configuration_errors() {
        assert!(TreeError::DuplicateName("a".into()).is_configuration_error());
        assert!(TreeError::InvalidArity(0).is_configuration_error());
        assert!(TreeError::EmptyTree.is_configuration_error());
        assert!(!TreeError::UnknownNode("x".into()).is_configuration_error());
    }

    #[test]
    fn unknown_node_is_recoverable() {
        let err: TreeLockError = TreeError::UnknownNode("x".into()).into();
        assert!(err.is_recoverable());

        let err: TreeLockError = TreeError::InvalidArity(0).into();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            TreeError::UnknownNode("leaf".into()).to_string(),
            "unknown node: 'leaf'"
        );
        assert_eq!(QueryError::UnknownOpcode(9).to_string(), "unknown opcode 9");
    }
}
