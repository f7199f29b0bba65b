//! HTTP routes for the gate service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use scope_gate::{Gate, RequiredScopes};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Scope required for the operator key endpoints.
pub const ADMIN_SCOPE: &str = "gate.admin";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authorization gate holding the trusted keys.
    pub gate: Gate,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness check (simple "OK") - public
/// - `/ready` - Readiness check (trusted keys loaded) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/v1/keys` - Trusted algorithms - requires `gate.admin`
/// - `/api/v1/keys/reload` - Refetch keys from the authority - requires `gate.admin`
/// - `/api/v1/ping` - Any valid token
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let gate = state.gate.clone();

    // Public routes (no authorization required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes; each handler is wrapped individually by the gate
    let protected_routes = Router::new()
        .route(
            "/api/v1/keys",
            get(gate.protect([ADMIN_SCOPE], handlers::list_keys)),
        )
        .route(
            "/api/v1/keys/reload",
            post(gate.protect([ADMIN_SCOPE], handlers::reload_keys)),
        )
        .route(
            "/api/v1/ping",
            get(gate.protect(RequiredScopes::none(), handlers::ping)),
        )
        .with_state(state);

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
