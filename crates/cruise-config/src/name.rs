//! Names used by the configuration model
//!
//! Pipeline names are case-insensitive identifiers: `Build` and `build`
//! refer to the same pipeline. The spelling the user wrote is kept for
//! display and error messages.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Case-insensitive pipeline name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PipelineName {
    name: String,
    key: String,
}

impl PipelineName {
    /// Create pipeline name, preserving the given spelling
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.to_lowercase();
        Self { name, key }
    }

    /// Name as written
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Normalized form used for comparison
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for PipelineName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PipelineName {}

impl Hash for PipelineName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for PipelineName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PipelineName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for PipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<String> for PipelineName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for PipelineName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<PipelineName> for String {
    fn from(name: PipelineName) -> Self {
        name.name
    }
}

/// Environment name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Create environment name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvironmentName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EnvironmentName {
    fn from(name: String) -> Self {
        Self(name)
    }
}
