pub mod coded_values;
pub mod engine;
pub mod required_resources;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::document::Document;

pub use coded_values::CodedValueValidator;
pub use engine::{BundleValidator, validate};
pub use required_resources::RequiredResourcesValidator;

/// One independent check run against a document.
///
/// Modules never fail: every problem they detect, including an unreachable
/// collaborator, is reported as issues. Modules are run in registration
/// order and know nothing about each other.
#[async_trait]
pub trait ValidationModule: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    async fn validate(&self, document: &Document) -> Vec<ValidationIssue>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub code: IssueType,
    pub message: String,
    /// Pointer to the offending item, e.g. `Coding(system|code)`
    pub location: Option<String>,
    /// Element path of the offending item
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Information,
}

/// OperationOutcome issue type codes produced by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Structure,
    Required,
    CodeInvalid,
    Informational,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationSeverity::Error => "error",
            ValidationSeverity::Warning => "warning",
            ValidationSeverity::Information => "information",
        }
    }
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Structure => "structure",
            IssueType::Required => "required",
            IssueType::CodeInvalid => "code-invalid",
            IssueType::Informational => "informational",
        }
    }
}

impl ValidationIssue {
    pub fn error(code: IssueType, message: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Error, code, message)
    }

    pub fn warning(code: IssueType, message: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Warning, code, message)
    }

    pub fn information(code: IssueType, message: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Information, code, message)
    }

    fn new(severity: ValidationSeverity, code: IssueType, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            expression: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }

    fn to_fhir(&self) -> Value {
        let mut issue = json!({
            "severity": self.severity.as_str(),
            "code": self.code.as_str(),
            "diagnostics": self.message,
        });
        if let Some(location) = &self.location {
            issue["location"] = json!([location]);
        }
        if let Some(expression) = &self.expression {
            issue["expression"] = json!([expression]);
        }
        issue
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str().to_uppercase(), self.message)?;
        if let Some(location) = &self.location {
            write!(f, " @ {location}")?;
        }
        Ok(())
    }
}

/// Aggregate result of one validation run over one document.
///
/// Issues keep the order in which modules were registered and, within a
/// module, the order in which they were emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub issues: Vec<ValidationIssue>,
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl OutcomeReport {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let count = |severity: ValidationSeverity| {
            issues.iter().filter(|i| i.severity == severity).count()
        };
        let error_count = count(ValidationSeverity::Error);
        let warning_count = count(ValidationSeverity::Warning);
        let info_count = count(ValidationSeverity::Information);

        Self {
            is_valid: error_count == 0,
            issues,
            error_count,
            warning_count,
            info_count,
        }
    }

    pub fn success() -> Self {
        Self::from_issues(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    /// Render as a FHIR `OperationOutcome` resource.
    ///
    /// An outcome needs at least one issue, so an empty report renders a
    /// single informational issue.
    pub fn to_operation_outcome(&self) -> Value {
        let issues: Vec<Value> = if self.issues.is_empty() {
            vec![
                ValidationIssue::information(
                    IssueType::Informational,
                    "No issues detected during validation",
                )
                .to_fhir(),
            ]
        } else {
            self.issues.iter().map(ValidationIssue::to_fhir).collect()
        };

        json!({
            "resourceType": "OperationOutcome",
            "issue": issues,
        })
    }
}

impl Default for OutcomeReport {
    fn default() -> Self {
        Self::success()
    }
}
