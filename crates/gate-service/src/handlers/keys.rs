//! Operator endpoints for the trusted key set.
//!
//! Both handlers are registered behind the gate with the admin scope.

use crate::errors::ServiceError;
use crate::models::KeysResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/keys
///
/// Lists the algorithms the gate currently trusts.
#[instrument(skip_all, name = "gate.keys.list")]
pub async fn list_keys(State(state): State<Arc<AppState>>) -> Json<KeysResponse> {
    Json(KeysResponse {
        algorithms: state.gate.algorithms_supported().await,
    })
}

/// Handler for POST /api/v1/keys/reload
///
/// Refetches the key document from the authority. On failure the previously
/// trusted keys stay in place and the caller gets a generic 503.
#[instrument(skip_all, name = "gate.keys.reload")]
pub async fn reload_keys(
    State(state): State<Arc<AppState>>,
) -> Result<Json<KeysResponse>, ServiceError> {
    let count = state
        .gate
        .load_keys(&state.config.authority_url)
        .await
        .map_err(|e| ServiceError::ServiceUnavailable(format!("key reload failed: {e}")))?;

    tracing::info!(target: "gate.keys", key_count = count, "Trusted keys reloaded by operator");

    Ok(Json(KeysResponse {
        algorithms: state.gate.algorithms_supported().await,
    }))
}
