//! Bundle validation endpoint

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::info;

use crate::document::Document;
use crate::narrative::ensure_minimal_narrative;
use crate::server::AppState;
use crate::server::error::{Result, ServerError};

/// `POST /api/validate/bundle`
///
/// Always answers `200` with an OperationOutcome once the body parses, no
/// matter how many issues were found.
pub async fn validate_bundle(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let mut value: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::BadRequest(format!("Request body is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ServerError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    let filled = ensure_minimal_narrative(&mut value);
    let document = Document::from_value(value)?;
    info!(
        resource_type = document.resource_type().unwrap_or("<none>"),
        narratives_filled = filled,
        "Validating submitted document"
    );

    let report = state.validator.validate(&document).await;

    Ok((
        [(header::CONTENT_TYPE, "application/fhir+json")],
        Json(report.to_operation_outcome()),
    )
        .into_response())
}
