//! Harness configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for running a query stream through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Abort on unknown opcodes or unknown node names instead of answering `false`
    pub strict: bool,
    /// Run the brute-force invariant checker after every query
    pub verify_invariants: bool,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With strict input handling
    #[inline]
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// With per-query invariant verification
    #[inline]
    #[must_use]
    pub fn with_verify_invariants(mut self, verify: bool) -> Self {
        self.verify_invariants = verify;
        self
    }

    /// With a log filter directive
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys, and
    /// [`ConfigError::EmptyLogFilter`] if validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check field values
    ///
    /// # Errors
    /// [`ConfigError::EmptyLogFilter`] if `log_filter` is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            strict: false,
            verify_invariants: false,
            log_filter: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HarnessConfig::new();
        assert!(!config.strict);
        assert!(!config.verify_invariants);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml_str("strict = true\n").unwrap();
        assert!(config.strict);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            HarnessConfig::from_toml_str("stricter = true\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_blank_filter() {
        assert!(matches!(
            HarnessConfig::from_toml_str("log_filter = \"  \"\n"),
            Err(ConfigError::EmptyLogFilter)
        ));
    }

    #[test]
    fn builder_chain() {
        let config = HarnessConfig::new()
            .with_strict(true)
            .with_verify_invariants(true)
            .with_log_filter("treelock_core=debug");
        assert!(config.strict && config.verify_invariants);
        assert_eq!(config.log_filter, "treelock_core=debug");
    }
}
