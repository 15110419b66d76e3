//! Error handling for the HTTP layer

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::error::ValidatorError;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Validator(ValidatorError::Document { .. })
            | ServerError::Validator(ValidatorError::Serialization(_)) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) | ServerError::Io(_) | ServerError::Validator(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// OperationOutcome issue type matching the status
    fn issue_code(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "invalid"
        } else {
            "exception"
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Server error occurred");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = Json(json!({
            "resourceType": "OperationOutcome",
            "issue": [{
                "severity": if status.is_server_error() { "fatal" } else { "error" },
                "code": self.issue_code(),
                "diagnostics": self.to_string(),
            }]
        }));

        (
            status,
            [(header::CONTENT_TYPE, "application/fhir+json")],
            body,
        )
            .into_response()
    }
}
