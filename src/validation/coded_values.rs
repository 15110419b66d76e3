//! Terminology check of every coded value under the target coding system.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use super::{IssueType, ValidationIssue, ValidationModule};
use crate::document::{CodedValue, Document};
use crate::terminology::TerminologyService;

/// Validator module that confirms each coded value of one system with a
/// terminology service.
///
/// Every occurrence is looked up, duplicates included, and every rejected
/// occurrence produces its own issue. Codings without a code (or with a blank
/// one) are skipped without a lookup.
pub struct CodedValueValidator {
    service: Arc<dyn TerminologyService>,
    system: String,
    max_concurrent_lookups: usize,
}

impl CodedValueValidator {
    pub fn new(service: Arc<dyn TerminologyService>, system: impl Into<String>) -> Self {
        Self {
            service,
            system: system.into(),
            max_concurrent_lookups: 1,
        }
    }

    /// Allow up to `limit` lookups in flight. Issue order still follows
    /// document order.
    pub fn with_max_concurrent_lookups(mut self, limit: usize) -> Self {
        self.max_concurrent_lookups = limit.max(1);
        self
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub async fn check(&self, document: &Document) -> Vec<ValidationIssue> {
        let codings: Vec<(&str, CodedValue<'_>)> = document
            .codings(&self.system)
            .filter_map(|coding| coding.code().map(|code| (code, coding)))
            .collect();

        let codes: Vec<&str> = codings.iter().map(|(code, _)| *code).collect();
        let verdicts = self.lookup_all(&codes).await;

        codings
            .into_iter()
            .zip(verdicts)
            .filter_map(|((code, coding), valid)| {
                if valid {
                    debug!(code, "Valid code");
                    None
                } else {
                    info!(code, path = %coding.path, "Invalid code detected");
                    Some(self.issue_for(code, coding))
                }
            })
            .collect()
    }

    /// One verdict per code, in input order. Lookups run in batches of at
    /// most `max_concurrent_lookups`.
    async fn lookup_all(&self, codes: &[&str]) -> Vec<bool> {
        let mut verdicts = Vec::with_capacity(codes.len());

        if self.max_concurrent_lookups == 1 {
            for code in codes {
                verdicts.push(self.service.is_valid(code).await);
            }
            return verdicts;
        }

        for batch in codes.chunks(self.max_concurrent_lookups) {
            let lookups: Vec<_> = batch.iter().map(|code| self.service.is_valid(code)).collect();
            verdicts.extend(join_all(lookups).await);
        }
        verdicts
    }

    fn issue_for(&self, code: &str, coding: CodedValue<'_>) -> ValidationIssue {
        ValidationIssue::error(
            IssueType::CodeInvalid,
            format!(
                "Code '{code}' is not valid in {} according to the terminology server.",
                self.system
            ),
        )
        .with_location(coding.location())
        .with_expression(coding.path)
    }
}

impl std::fmt::Debug for CodedValueValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodedValueValidator")
            .field("system", &self.system)
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ValidationModule for CodedValueValidator {
    fn name(&self) -> &'static str {
        "coded-values"
    }

    async fn validate(&self, document: &Document) -> Vec<ValidationIssue> {
        self.check(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SNOMED_SYSTEM;
    use crate::terminology::InMemoryTerminologyService;
    use serde_json::{Value, json};

    fn condition_with_codes(codes: &[Value]) -> Document {
        let coding: Vec<_> = codes
            .iter()
            .map(|code| json!({"system": SNOMED_SYSTEM, "code": code}))
            .collect();
        Document::from_value(json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Condition", "code": {"coding": coding}}}]
        }))
        .unwrap()
    }

    fn validator(valid: &[&str]) -> (Arc<InMemoryTerminologyService>, CodedValueValidator) {
        let service = Arc::new(InMemoryTerminologyService::with_codes(valid.iter().copied()));
        let validator = CodedValueValidator::new(service.clone(), SNOMED_SYSTEM);
        (service, validator)
    }

    #[tokio::test]
    async fn test_only_invalid_codes_are_reported() {
        let (_, validator) = validator(&["X"]);
        let issues = validator
            .check(&condition_with_codes(&[json!("X"), json!("Y")]))
            .await;

        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("'Y'"));
        assert!(!issues[0].message.contains("'X'"));
        assert_eq!(
            issues[0].location.as_deref(),
            Some("Coding(http://snomed.info/sct|Y)")
        );
        assert_eq!(
            issues[0].expression.as_deref(),
            Some("Bundle.entry[0].resource.code.coding[1]")
        );
    }

    #[tokio::test]
    async fn test_blank_codes_are_not_looked_up() {
        let (service, validator) = validator(&[]);
        let issues = validator
            .check(&condition_with_codes(&[json!(""), json!("   "), Value::Null]))
            .await;

        assert!(issues.is_empty());
        assert_eq!(service.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_codes_are_each_looked_up_and_reported() {
        let (service, validator) = validator(&[]);
        let issues = validator
            .check(&condition_with_codes(&[json!("Z"), json!("Z")]))
            .await;

        assert_eq!(issues.len(), 2);
        assert_eq!(service.lookups(), vec!["Z", "Z"]);
    }

    #[tokio::test]
    async fn test_other_systems_are_ignored() {
        let (service, validator) = validator(&[]);
        let doc = Document::from_value(json!({
            "resourceType": "Condition",
            "code": {"coding": [{"system": "http://loinc.org", "code": "1234-5"}]}
        }))
        .unwrap();

        assert!(validator.check(&doc).await.is_empty());
        assert_eq!(service.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_keep_document_order() {
        let (_, validator) = validator(&["B"]);
        let validator = validator.with_max_concurrent_lookups(4);
        let issues = validator
            .check(&condition_with_codes(&[json!("A"), json!("B"), json!("C"), json!("D")]))
            .await;

        let locations: Vec<_> = issues.iter().filter_map(|i| i.location.clone()).collect();
        assert_eq!(
            locations,
            vec![
                "Coding(http://snomed.info/sct|A)",
                "Coding(http://snomed.info/sct|C)",
                "Coding(http://snomed.info/sct|D)",
            ]
        );
    }

    #[tokio::test]
    async fn test_uneven_batches_look_up_every_code_in_order() {
        let (service, validator) = validator(&["2", "5"]);
        let validator = validator.with_max_concurrent_lookups(2);
        let codes: Vec<Value> = ["1", "2", "3", "4", "5"].into_iter().map(Value::from).collect();

        let issues = validator.check(&condition_with_codes(&codes)).await;

        assert_eq!(service.lookups(), vec!["1", "2", "3", "4", "5"]);
        let expressions: Vec<_> = issues.iter().filter_map(|i| i.expression.clone()).collect();
        assert_eq!(
            expressions,
            vec![
                "Bundle.entry[0].resource.code.coding[0]",
                "Bundle.entry[0].resource.code.coding[2]",
                "Bundle.entry[0].resource.code.coding[3]",
            ]
        );
    }

    #[tokio::test]
    async fn test_module_future_runs_on_spawned_task() {
        let (_, validator) = validator(&[]);
        let validator = Arc::new(validator.with_max_concurrent_lookups(3));
        let doc = condition_with_codes(&[json!("A"), json!("B")]);

        let issues = tokio::spawn(async move { validator.validate(&doc).await })
            .await
            .unwrap();
        assert_eq!(issues.len(), 2);
    }
}
