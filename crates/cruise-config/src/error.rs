//! Error types for configuration validation
//!
//! Two kinds of failure are kept apart:
//! - [`SnapshotError`]: the caller handed over an unusable snapshot
//! - [`ConfigurationInvalidError`]: the snapshot is well formed but
//!   breaks a referential-integrity rule

use crate::validation::Violation;
use std::fmt;

/// Main configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Snapshot could not be built
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Snapshot failed validation
    #[error(transparent)]
    Invalid(#[from] ConfigurationInvalidError),
}

impl ConfigError {
    /// Whether a retry without changes could succeed
    ///
    /// Neither kind is: both need a corrected configuration.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Snapshot construction errors (caller errors, not validation failures)
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A required part of the snapshot is missing or null
    #[error("incomplete snapshot: missing `{field}`")]
    Incomplete {
        /// Name of the missing field
        field: &'static str,
    },

    /// Document is not valid JSON for a snapshot
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Environments reference pipelines that are not defined
///
/// Carries every offending pair, ordered by environment declaration order
/// then by pipeline name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ConfigurationInvalidError {
    violations: Vec<Violation>,
}

impl ConfigurationInvalidError {
    /// Create from collected violations
    #[inline]
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// All violations
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consume into the violation list
    #[inline]
    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ConfigurationInvalidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration ({} violation", self.violations.len())?;
        if self.violations.len() != 1 {
            f.write_str("s")?;
        }
        f.write_str(")")?;
        for violation in &self.violations {
            write!(f, "; {violation}")?;
        }
        Ok(())
    }
}
