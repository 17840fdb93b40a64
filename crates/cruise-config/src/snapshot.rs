//! Immutable configuration snapshot consumed by validators
//!
//! A snapshot holds the names of all defined pipelines and the ordered
//! list of environments. It is read-only once built and can be shared
//! across threads behind an `Arc`.

use crate::error::SnapshotError;
use crate::name::{EnvironmentName, PipelineName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named grouping of pipelines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    /// Environment name
    pub name: EnvironmentName,
    /// Referenced pipeline names (set semantics)
    #[serde(default)]
    pub pipelines: BTreeSet<PipelineName>,
}

impl EnvironmentDefinition {
    /// Create environment with no pipelines
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<EnvironmentName>) -> Self {
        Self {
            name: name.into(),
            pipelines: BTreeSet::new(),
        }
    }

    /// With a referenced pipeline
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: impl Into<PipelineName>) -> Self {
        self.pipelines.insert(pipeline.into());
        self
    }

    /// With several referenced pipelines
    #[must_use]
    pub fn with_pipelines<I, P>(mut self, pipelines: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PipelineName>,
    {
        self.pipelines.extend(pipelines.into_iter().map(Into::into));
        self
    }

    /// Whether this environment references the pipeline
    #[inline]
    #[must_use]
    pub fn contains_pipeline(&self, pipeline: &PipelineName) -> bool {
        self.pipelines.contains(pipeline)
    }
}

/// Read-only view of the configuration being committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationSnapshot {
    pipelines: BTreeSet<PipelineName>,
    environments: Vec<EnvironmentDefinition>,
}

/// Wire shape with every part optional, so absence can be told apart
/// from a parse failure.
#[derive(Deserialize)]
struct RawSnapshot {
    pipelines: Option<BTreeSet<PipelineName>>,
    environments: Option<Vec<EnvironmentDefinition>>,
}

impl ConfigurationSnapshot {
    /// Create snapshot from defined pipeline names, with no environments
    #[must_use]
    pub fn new<I, P>(pipelines: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PipelineName>,
    {
        Self {
            pipelines: pipelines.into_iter().map(Into::into).collect(),
            environments: Vec::new(),
        }
    }

    /// With an environment appended in declaration order
    #[must_use]
    pub fn with_environment(mut self, environment: EnvironmentDefinition) -> Self {
        self.environments.push(environment);
        self
    }

    /// Parse snapshot from JSON
    ///
    /// # Errors
    /// - `SnapshotError::Incomplete` if `pipelines` or `environments` is
    ///   absent or null
    /// - `SnapshotError::Malformed` if the document does not parse
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: RawSnapshot = serde_json::from_str(json)?;

        let pipelines = raw
            .pipelines
            .ok_or(SnapshotError::Incomplete { field: "pipelines" })?;
        let environments = raw
            .environments
            .ok_or(SnapshotError::Incomplete {
                field: "environments",
            })?;

        Ok(Self {
            pipelines,
            environments,
        })
    }

    /// All defined pipeline names
    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &BTreeSet<PipelineName> {
        &self.pipelines
    }

    /// Environments in declaration order
    #[inline]
    #[must_use]
    pub fn environments(&self) -> &[EnvironmentDefinition] {
        &self.environments
    }

    /// Whether a pipeline with this name is defined
    #[inline]
    #[must_use]
    pub fn has_pipeline(&self, pipeline: &PipelineName) -> bool {
        self.pipelines.contains(pipeline)
    }
}
