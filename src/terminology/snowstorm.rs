//! HTTP client for a Snowstorm terminology server.
//!
//! Two endpoint shapes are supported, chosen once per deployment:
//!
//! - `POST {base}/fhir/CodeSystem/$validate-code` with a FHIR `Parameters`
//!   body naming the coding system and the code. Valid when the status is 2xx
//!   and the response carries a `result` parameter with `valueBoolean: true`.
//!   Snowstorm speaks FHIR R4 here, which is fine for any FHIR version of the
//!   submitted document since only `(system, code)` pairs are exchanged.
//! - `GET {base}/browser/{branch}/concepts/{code}`. Valid when the status is
//!   200 and the concept has `active: true`.
//!
//! Both lookups fail closed and perform no retries.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::TerminologyService;
use crate::core::{LookupMode, TerminologyConfig};
use crate::error::{Result, ValidatorError};

const FHIR_JSON: &str = "application/fhir+json";

/// Reasons a lookup could not produce a positive answer.
#[derive(Debug, Error)]
pub enum TerminologyError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status {status}")]
    UnexpectedStatus { status: StatusCode },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

pub type TerminologyResult<T> = std::result::Result<T, TerminologyError>;

#[derive(Debug, Deserialize)]
struct Parameters {
    #[serde(default)]
    parameter: Vec<Parameter>,
}

#[derive(Debug, Deserialize)]
struct Parameter {
    name: String,
    #[serde(rename = "valueBoolean")]
    value_boolean: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Concept {
    active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SnowstormClient {
    /// Server root, without the `/fhir` suffix
    base_url: Url,
    branch: String,
    system: String,
    mode: LookupMode,
    client: Client,
}

impl SnowstormClient {
    /// Build a client for `system` from the terminology configuration.
    pub fn new(config: &TerminologyConfig, system: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ValidatorError::terminology(err.to_string()))?;

        Ok(Self {
            base_url: config.base_url()?,
            branch: config.branch.clone(),
            system: system.into(),
            mode: config.mode,
            client,
        })
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    /// Validate a code with the FHIR `$validate-code` operation.
    pub async fn validate_code(&self, code: &str) -> bool {
        match self.try_validate_code(code).await {
            Ok(valid) => valid,
            Err(err) => {
                warn!(code, error = %err, "Snowstorm $validate-code failed");
                false
            }
        }
    }

    /// Check that a concept exists and is active on the configured branch.
    pub async fn concept_exists(&self, code: &str) -> bool {
        match self.try_concept_exists(code).await {
            Ok(active) => active,
            Err(err) => {
                warn!(code, error = %err, "Snowstorm concept lookup failed");
                false
            }
        }
    }

    async fn try_validate_code(&self, code: &str) -> TerminologyResult<bool> {
        let endpoint = self.endpoint(["fhir", "CodeSystem", "$validate-code"])?;
        let body = json!({
            "resourceType": "Parameters",
            "parameter": [
                {"name": "url", "valueUri": self.system},
                {"name": "code", "valueCode": code}
            ]
        });

        debug!(%endpoint, code, "Snowstorm $validate-code");
        let response = self
            .client
            .post(endpoint)
            .header(header::CONTENT_TYPE, FHIR_JSON)
            .header(header::ACCEPT, FHIR_JSON)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TerminologyError::UnexpectedStatus { status });
        }

        let parameters: Parameters = response.json().await?;
        let valid = parameters
            .parameter
            .iter()
            .any(|p| p.name == "result" && p.value_boolean == Some(true));
        debug!(code, %status, valid, "Snowstorm $validate-code answered");
        Ok(valid)
    }

    async fn try_concept_exists(&self, code: &str) -> TerminologyResult<bool> {
        let segments = std::iter::once("browser")
            .chain(self.branch.split('/').filter(|s| !s.is_empty()))
            .chain(["concepts", code]);
        let endpoint = self.endpoint(segments)?;

        debug!(%endpoint, code, "Snowstorm native concept lookup");
        let response = self.client.get(endpoint).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TerminologyError::UnexpectedStatus { status });
        }

        let concept: Concept = response.json().await?;
        Ok(concept.active == Some(true))
    }

    fn endpoint<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> TerminologyResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TerminologyError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl TerminologyService for SnowstormClient {
    async fn is_valid(&self, code: &str) -> bool {
        match self.mode {
            LookupMode::ValidateCode => self.validate_code(code).await,
            LookupMode::ConceptLookup => self.concept_exists(code).await,
        }
    }
}
