//! Structural completeness: a Bundle must contain every required resource type.

use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

use super::{IssueType, ValidationIssue, ValidationModule};
use crate::core::RequiredTypeSet;
use crate::core::types::join_with_and;
use crate::document::Document;

#[derive(Debug, Clone, Default)]
pub struct RequiredResourcesValidator {
    required: RequiredTypeSet,
}

impl RequiredResourcesValidator {
    pub fn new(required: RequiredTypeSet) -> Self {
        Self { required }
    }

    pub fn required(&self) -> &RequiredTypeSet {
        &self.required
    }

    /// Run the check synchronously; it needs no collaborators.
    pub fn check(&self, document: &Document) -> Vec<ValidationIssue> {
        if !document.is_bundle() {
            return vec![ValidationIssue::error(
                IssueType::Structure,
                format!(
                    "Root resource must be a Bundle containing at least: {}.",
                    self.required.describe()
                ),
            )];
        }

        let present: HashSet<&str> = document
            .entries()
            .filter_map(|entry| entry.resource_type())
            .collect();
        let missing = self.required.missing_from(&present);

        debug!(present = present.len(), missing = missing.len(), "Required resources checked");

        if missing.is_empty() {
            return Vec::new();
        }

        vec![ValidationIssue::error(
            IssueType::Required,
            format!(
                "Bundle is missing required resources: {}.",
                join_with_and(&missing)
            ),
        )
        .with_expression("Bundle.entry")]
    }
}

#[async_trait]
impl ValidationModule for RequiredResourcesValidator {
    fn name(&self) -> &'static str {
        "required-resources"
    }

    async fn validate(&self, document: &Document) -> Vec<ValidationIssue> {
        self.check(document)
    }
}
