//! Cruise Config
//!
//! Configuration snapshot model and referential-integrity validation.
//!
//! # Overview
//!
//! - **ConfigurationSnapshot**: read-only view of defined pipelines and environments
//! - **EnvironmentPipelineValidator**: every pipeline an environment names must exist
//! - **ValidatorRegistry**: runs a set of validators and merges their findings
//!
//! # Example
//!
//! ```rust
//! use cruise_config::{ConfigValidator, ConfigurationSnapshot, EnvironmentDefinition};
//! use cruise_config::{EnvironmentPipelineValidator, Violation};
//!
//! let snapshot = ConfigurationSnapshot::new(["p1", "p3"])
//!     .with_environment(EnvironmentDefinition::new("CI").with_pipelines(["p1", "p2"]));
//!
//! let result = EnvironmentPipelineValidator::new().validate(&snapshot);
//! assert_eq!(result.violations(), &[Violation::new("CI", "p2")]);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod name;
pub mod snapshot;
pub mod validation;

// Re-exports
pub use error::{ConfigError, ConfigurationInvalidError, SnapshotError};
pub use name::{EnvironmentName, PipelineName};
pub use snapshot::{ConfigurationSnapshot, EnvironmentDefinition};
pub use validation::{
    ConfigValidator, EnvironmentPipelineValidator, ValidationResult, ValidatorRegistry, Violation,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for configuration validation
    pub use crate::{
        ConfigValidator, ConfigurationInvalidError, ConfigurationSnapshot, EnvironmentDefinition,
        EnvironmentPipelineValidator, ValidationResult, ValidatorRegistry, Violation,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
