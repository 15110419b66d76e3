//! Shared fixtures for integration tests: an in-process Snowstorm stub and
//! Bundle builders.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use fhir_bundle_validator::{LookupMode, SNOMED_SYSTEM, ValidatorConfig};

/// How the stub answers every lookup.
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    /// Answer from the configured code sets
    Normal,
    /// Answer with this status and an otherwise positive body
    Status(u16),
    /// Answer 200 with a body that is not JSON
    MalformedBody,
    /// Sleep before answering normally
    Delay(Duration),
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct StubState {
    valid: Arc<BTreeSet<String>>,
    inactive: Arc<BTreeSet<String>>,
    behavior: StubBehavior,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct SnowstormStub {
    valid: Vec<String>,
    inactive: Vec<String>,
    behavior: StubBehavior,
}

/// Handle for a running stub; the server stops when the handle is dropped.
pub struct SnowstormStubHandle {
    base_url: String,
    join: JoinHandle<()>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl SnowstormStub {
    /// Stub that knows `valid` codes as valid and active concepts.
    pub fn with_valid(valid: &[&str]) -> Self {
        Self {
            valid: valid.iter().map(|c| c.to_string()).collect(),
            inactive: Vec::new(),
            behavior: StubBehavior::Normal,
        }
    }

    /// Codes known to the browser endpoint as inactive concepts.
    pub fn inactive(mut self, codes: &[&str]) -> Self {
        self.inactive = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn behavior(mut self, behavior: StubBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub async fn spawn(self) -> SnowstormStubHandle {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            valid: Arc::new(self.valid.into_iter().collect()),
            inactive: Arc::new(self.inactive.into_iter().collect()),
            behavior: self.behavior,
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/fhir/CodeSystem/$validate-code", post(handle_validate_code))
            .route("/browser/*rest", get(handle_concept))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub bind failed");
        let base_url = format!("http://{}", listener.local_addr().expect("stub address"));
        let join = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        SnowstormStubHandle {
            base_url,
            join,
            requests,
        }
    }
}

impl SnowstormStubHandle {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Codes received, in arrival order.
    pub fn requested_codes(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| match &r.body {
                Some(body) => code_parameter(body).map(str::to_string),
                None => r.path.rsplit('/').next().map(str::to_string),
            })
            .collect()
    }
}

impl Drop for SnowstormStubHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

async fn handle_validate_code(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parsed: Option<Value> = serde_json::from_slice(&body).ok();
    let code = parsed
        .as_ref()
        .and_then(code_parameter)
        .unwrap_or_default()
        .to_string();
    record(
        &state,
        RecordedRequest {
            method: "POST",
            path: "/fhir/CodeSystem/$validate-code".to_string(),
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: parsed,
        },
    );

    let result = |valid: bool| {
        json!({
            "resourceType": "Parameters",
            "parameter": [
                {"name": "result", "valueBoolean": valid},
                {"name": "display", "valueString": "stub"}
            ]
        })
    };

    match state.behavior {
        StubBehavior::Status(status) => (status_code(status), axum::Json(result(true))).into_response(),
        StubBehavior::MalformedBody => (StatusCode::OK, "<html>not json</html>").into_response(),
        StubBehavior::Delay(delay) => {
            tokio::time::sleep(delay).await;
            axum::Json(result(state.valid.contains(&code))).into_response()
        }
        StubBehavior::Normal => axum::Json(result(state.valid.contains(&code))).into_response(),
    }
}

async fn handle_concept(State(state): State<StubState>, Path(rest): Path<String>) -> Response {
    let path = format!("/browser/{}", rest.trim_start_matches('/'));
    record(
        &state,
        RecordedRequest {
            method: "GET",
            path: path.clone(),
            content_type: None,
            body: None,
        },
    );

    let Some((_, code)) = path.rsplit_once("/concepts/") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let concept = |active: bool| json!({"conceptId": code, "active": active, "moduleId": "900000000000207008"});

    match state.behavior {
        StubBehavior::Status(status) => (status_code(status), axum::Json(concept(true))).into_response(),
        StubBehavior::MalformedBody => (StatusCode::OK, "not json").into_response(),
        StubBehavior::Delay(delay) => {
            tokio::time::sleep(delay).await;
            concept_response(&state, code, concept)
        }
        StubBehavior::Normal => concept_response(&state, code, concept),
    }
}

fn concept_response(state: &StubState, code: &str, concept: impl Fn(bool) -> Value) -> Response {
    if state.valid.contains(code) {
        axum::Json(concept(true)).into_response()
    } else if state.inactive.contains(code) {
        axum::Json(concept(false)).into_response()
    } else {
        (StatusCode::NOT_FOUND, axum::Json(json!({"error": "NOT_FOUND"}))).into_response()
    }
}

fn code_parameter(body: &Value) -> Option<&str> {
    body.get("parameter")?
        .as_array()?
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some("code"))?
        .get("valueCode")?
        .as_str()
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn record(state: &StubState, request: RecordedRequest) {
    let Ok(mut guard) = state.requests.lock() else {
        return;
    };
    guard.push(request);
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    format!("http://{addr}")
}

/// Configuration pointing at `base_url` with short timeouts.
pub fn config_for(base_url: &str, mode: LookupMode) -> ValidatorConfig {
    let mut config = ValidatorConfig::default();
    config.terminology.base_url = base_url.to_string();
    config.terminology.mode = mode;
    config.terminology.request_timeout_ms = 500;
    config.terminology.connect_timeout_ms = 500;
    config
}

/// Bundle with one resource per type; each `(type, code)` pair in `coded`
/// adds a Condition-style `code.coding` under SNOMED CT to that resource.
pub fn bundle(types: &[&str], coded: &[(&str, &str)]) -> Value {
    let entries: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, resource_type)| {
            let mut resource = json!({"resourceType": resource_type, "id": format!("r{i}")});
            let coding: Vec<Value> = coded
                .iter()
                .filter(|(t, _)| t == resource_type)
                .map(|(_, code)| json!({"system": SNOMED_SYSTEM, "code": code}))
                .collect();
            if !coding.is_empty() {
                resource["code"] = json!({"coding": coding});
            }
            json!({"fullUrl": format!("urn:uuid:r{i}"), "resource": resource})
        })
        .collect();

    json!({"resourceType": "Bundle", "type": "collection", "entry": entries})
}

pub fn complete_bundle(coded: &[(&str, &str)]) -> Value {
    bundle(&["Patient", "Encounter", "Condition", "Organization"], coded)
}
