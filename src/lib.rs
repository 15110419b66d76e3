//! # FHIR Bundle Validator
//!
//! Validates FHIR Bundles against two rules layered on top of ordinary
//! resource validation:
//!
//! - **Completeness**: the Bundle must contain at least one resource of every
//!   required type (by default Patient, Encounter, Condition and Organization).
//! - **Terminology**: every coding under the target system (SNOMED CT by
//!   default) must be confirmed by a terminology server. Lookups fail closed,
//!   so an unreachable server turns into validation errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhir_bundle_validator::*;
//!
//! # async fn example() -> Result<()> {
//! let config = ValidatorConfig::load(&ConfigArgs::default())?;
//! let validator = BundleValidator::from_config(&config)?;
//!
//! let mut bundle: serde_json::Value = serde_json::from_str(r#"{"resourceType":"Bundle"}"#)?;
//! ensure_minimal_narrative(&mut bundle);
//!
//! let report = validator.validate(&Document::from_value(bundle)?).await;
//! println!("{}", report.to_operation_outcome());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod document;
pub mod error;
pub mod narrative;
pub mod terminology;
pub mod validation;

#[cfg(feature = "server")]
pub mod server;

pub use crate::core::{
    ConfigArgs, LookupMode, RequiredTypeSet, SNOMED_SYSTEM, ServerSettings, TerminologyConfig,
    ValidationConfig, ValidatorConfig,
};
pub use document::{CodedValue, Document, Node, extract_codings};
pub use error::{Result, ValidatorError};
pub use narrative::ensure_minimal_narrative;
pub use terminology::{InMemoryTerminologyService, SnowstormClient, TerminologyService};
pub use validation::{
    BundleValidator, CodedValueValidator, IssueType, OutcomeReport, RequiredResourcesValidator,
    ValidationIssue, ValidationModule, ValidationSeverity,
};
