//! Gate Service
//!
//! Loads the identity authority's signing keys and serves scope-protected
//! endpoints.

use gate_service::config::Config;
use gate_service::observability::metrics::init_metrics_recorder;
use gate_service::routes::{self, AppState};
use scope_gate::{Gate, HttpFetcher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gate_service=debug,scope_gate=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gate Service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        authority_url = %config.authority_url,
        bind_address = %config.bind_address,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        key_fetch_timeout_seconds = config.key_fetch_timeout_seconds,
        drain_seconds = config.drain_seconds,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Build the gate and load trusted keys before accepting traffic
    let gate = Gate::with_fetcher(Arc::new(HttpFetcher::with_timeout(
        config.key_fetch_timeout(),
    )))
    .with_clock_skew(config.clock_skew());

    let key_count = gate.load_keys(&config.authority_url).await.map_err(|e| {
        error!("Failed to load trusted keys from authority: {}", e);
        e
    })?;

    info!(key_count, "Trusted keys loaded");

    // Read what shutdown needs before moving config
    let bind_address = config.bind_address.clone();
    let drain_period = config.drain_period();

    // Create application state
    let state = Arc::new(AppState { gate, config });

    // Build application routes
    let app = routes::build_routes(state, metrics_handle);

    // Parse bind address
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Gate Service listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_period))
    .await?;

    info!("Gate Service shutdown complete");

    Ok(())
}

/// Resolves once SIGINT or SIGTERM has arrived and `drain_period` has passed.
async fn shutdown_signal(drain_period: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_period.is_zero() {
        info!("Shutting down without a drain period");
        return;
    }

    warn!(drain_secs = drain_period.as_secs(), "Draining connections before shutdown");
    tokio::time::sleep(drain_period).await;
    info!("Drain period complete");
}
