//! Gate service error types.
//!
//! Operator-facing endpoints map errors to JSON bodies with generic messages;
//! the underlying cause is logged server-side. Authorization refusals never
//! pass through here: they are rendered by the gate as a bare 403.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Gate service error type.
///
/// Maps to HTTP status codes:
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServiceError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "gate.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
