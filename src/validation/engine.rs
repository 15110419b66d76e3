use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::{
    CodedValueValidator, OutcomeReport, RequiredResourcesValidator, ValidationIssue,
    ValidationModule,
};
use crate::core::ValidatorConfig;
use crate::document::Document;
use crate::error::Result;
use crate::terminology::{SnowstormClient, TerminologyService};

/// Run `modules` in order against `document` and aggregate their issues.
pub async fn validate(document: &Document, modules: &[Box<dyn ValidationModule>]) -> OutcomeReport {
    let mut issues: Vec<ValidationIssue> = Vec::new();

    for module in modules {
        let started = Instant::now();
        let found = module.validate(document).await;
        debug!(
            module = module.name(),
            issues = found.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Validation module finished"
        );
        issues.extend(found);
    }

    let report = OutcomeReport::from_issues(issues);
    info!(
        valid = report.is_valid,
        errors = report.error_count,
        warnings = report.warning_count,
        "Validation completed"
    );
    report
}

/// Ordered pipeline of validation modules, wired once at startup.
pub struct BundleValidator {
    modules: Vec<Box<dyn ValidationModule>>,
}

impl BundleValidator {
    pub fn new(modules: Vec<Box<dyn ValidationModule>>) -> Self {
        Self { modules }
    }

    /// Standard pipeline: required resources, then coded values checked
    /// against the configured terminology server.
    pub fn from_config(config: &ValidatorConfig) -> Result<Self> {
        let client = SnowstormClient::new(&config.terminology, &config.validation.target_system)?;
        Ok(Self::with_terminology(config, Arc::new(client)))
    }

    /// Standard pipeline backed by an arbitrary terminology service.
    pub fn with_terminology(config: &ValidatorConfig, service: Arc<dyn TerminologyService>) -> Self {
        Self::new(vec![
            Box::new(RequiredResourcesValidator::new(
                config.validation.required_types.clone(),
            )),
            Box::new(
                CodedValueValidator::new(service, &config.validation.target_system)
                    .with_max_concurrent_lookups(config.terminology.max_concurrent_lookups),
            ),
        ])
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name())
    }

    pub async fn validate(&self, document: &Document) -> OutcomeReport {
        validate(document, &self.modules).await
    }
}

impl std::fmt::Debug for BundleValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleValidator")
            .field("modules", &self.modules().collect::<Vec<_>>())
            .finish()
    }
}
