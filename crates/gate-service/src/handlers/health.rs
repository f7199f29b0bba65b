//! Health check handlers.
//!
//! - `/health`: Liveness check - returns OK if the process is running
//! - `/ready`: Readiness check - ready once trusted keys are loaded

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness check handler.
///
/// Does NOT check any dependencies - failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check handler.
///
/// Returns 200 with the trusted algorithms once at least one key is loaded,
/// 503 otherwise. A gate without keys denies every protected request, so the
/// instance should not receive traffic.
#[tracing::instrument(skip_all, name = "gate.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.gate.is_ready().await {
        tracing::warn!(target: "gate.health", "Readiness check failed: no trusted keys loaded");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                trusted_algorithms: None,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            trusted_algorithms: Some(state.gate.algorithms_supported().await),
        }),
    )
}
