//! Referential-integrity validation for configuration snapshots
//!
//! Validators never fail fast: each pass collects every violation so the
//! user can fix the configuration in one round.

use crate::error::ConfigurationInvalidError;
use crate::name::{EnvironmentName, PipelineName};
use crate::snapshot::ConfigurationSnapshot;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// An environment referring to a pipeline that is not defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Offending environment
    pub environment: EnvironmentName,
    /// Unknown pipeline it references
    pub pipeline: PipelineName,
}

impl Violation {
    /// Create violation
    #[inline]
    #[must_use]
    pub fn new(environment: impl Into<EnvironmentName>, pipeline: impl Into<PipelineName>) -> Self {
        Self {
            environment: environment.into(),
            pipeline: pipeline.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "environment '{}' refers to unknown pipeline '{}'",
            self.environment, self.pipeline
        )
    }
}

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// No violations
    Valid,
    /// At least one violation, in deterministic order
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    /// Build from collected violations; empty means valid
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(violations)
        }
    }

    /// Whether there were no violations
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Violations found (empty when valid)
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid => &[],
            Self::Invalid(violations) => violations,
        }
    }

    /// Append another result's violations after this one's
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Valid, other) => other,
            (this, Self::Valid) => this,
            (Self::Invalid(mut ours), Self::Invalid(theirs)) => {
                ours.extend(theirs);
                Self::Invalid(ours)
            }
        }
    }

    /// Convert into a `Result` for the commit workflow
    ///
    /// # Errors
    /// `ConfigurationInvalidError` carrying every violation when invalid
    pub fn into_result(self) -> Result<(), ConfigurationInvalidError> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(violations) => Err(ConfigurationInvalidError::new(violations)),
        }
    }
}

/// A check run against a snapshot before a configuration change is committed
pub trait ConfigValidator: fmt::Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Validate the snapshot, reporting every violation
    fn validate(&self, snapshot: &ConfigurationSnapshot) -> ValidationResult;
}

/// Guards against environments naming pipelines that do not exist
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentPipelineValidator;

impl EnvironmentPipelineValidator {
    /// Create new validator instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConfigValidator for EnvironmentPipelineValidator {
    fn name(&self) -> &'static str {
        "environment-pipelines"
    }

    fn validate(&self, snapshot: &ConfigurationSnapshot) -> ValidationResult {
        // Same-named declarations merge into one reference set, kept at
        // the position of the first declaration.
        let mut position: HashMap<&EnvironmentName, usize> = HashMap::new();
        let mut merged: Vec<(&EnvironmentName, BTreeSet<&PipelineName>)> = Vec::new();
        for environment in snapshot.environments() {
            let idx = *position.entry(&environment.name).or_insert_with(|| {
                merged.push((&environment.name, BTreeSet::new()));
                merged.len() - 1
            });
            merged[idx].1.extend(&environment.pipelines);
        }

        // Reference sets are ordered, so each environment's unknown
        // pipelines come out sorted by name.
        let violations: Vec<Violation> = merged
            .into_iter()
            .flat_map(|(environment, pipelines)| {
                pipelines
                    .into_iter()
                    .filter(move |pipeline| !snapshot.has_pipeline(pipeline))
                    .map(move |pipeline| Violation {
                        environment: environment.clone(),
                        pipeline: pipeline.clone(),
                    })
            })
            .collect();

        tracing::debug!(
            environments = snapshot.environments().len(),
            violations = violations.len(),
            "validated environment pipeline references"
        );

        ValidationResult::from_violations(violations)
    }
}

/// Ordered set of validators run together on every snapshot
#[derive(Debug, Default)]
pub struct ValidatorRegistry {
    validators: Vec<Box<dyn ConfigValidator>>,
}

impl ValidatorRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Create registry with the built-in validators
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(EnvironmentPipelineValidator::new());
        registry
    }

    /// Register a validator; validators run in registration order
    pub fn register(&mut self, validator: impl ConfigValidator + 'static) {
        self.validators.push(Box::new(validator));
    }

    /// Names of registered validators
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Get number of registered validators
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every validator and merge their violations
    #[must_use]
    pub fn validate(&self, snapshot: &ConfigurationSnapshot) -> ValidationResult {
        let result = self
            .validators
            .iter()
            .fold(ValidationResult::Valid, |acc, validator| {
                acc.merge(validator.validate(snapshot))
            });

        if let ValidationResult::Invalid(violations) = &result {
            tracing::info!(
                violations = violations.len(),
                "configuration rejected by validators"
            );
        }

        result
    }

    /// Run every validator, failing with all violations if any
    ///
    /// # Errors
    /// `ConfigurationInvalidError` when at least one validator reports a violation
    pub fn check(&self, snapshot: &ConfigurationSnapshot) -> Result<(), ConfigurationInvalidError> {
        self.validate(snapshot).into_result()
    }
}
