//! Test server harness for E2E testing
//!
//! Provides `TestGateServer`, which runs the real gate service routes against
//! a `wiremock` stand-in for the identity authority.

use crate::fixtures::{ed25519_public_pem, TRUSTED_RSA_PUBLIC_PEM};
use crate::key_document;
use gate_service::config::Config;
use gate_service::observability::metrics::init_metrics_recorder;
use gate_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use scope_gate::{Gate, HttpFetcher};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Seed of the Ed25519 key published by the default authority.
pub const AUTHORITY_ED25519_SEED: u8 = 1;

static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Process-wide metrics handle; the recorder can only be installed once.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Key document the default authority publishes: the trusted RSA key under
/// RS256 and the seed-1 Ed25519 key under EdDSA.
pub fn default_key_document() -> String {
    let ed_pem = ed25519_public_pem(AUTHORITY_ED25519_SEED);
    key_document(&[
        ("RS256", TRUSTED_RSA_PUBLIC_PEM),
        ("EdDSA", ed_pem.as_str()),
    ])
}

/// Test harness for spawning the gate service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_ping() -> Result<()> {
///     let server = TestGateServer::spawn().await?;
///     let token = TestTokenBuilder::new().sign_rs256();
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/api/v1/ping", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGateServer {
    addr: SocketAddr,
    authority: MockServer,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestGateServer {
    /// Spawn a server whose authority publishes [`default_key_document`],
    /// with keys already loaded.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_key_document(default_key_document()).await
    }

    /// Spawn a server whose authority publishes `body`, with keys already
    /// loaded.
    pub async fn spawn_with_key_document(body: String) -> Result<Self, anyhow::Error> {
        let authority = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token_keys"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&authority)
            .await;

        let server = Self::start(authority).await?;
        server
            .state
            .gate
            .load_keys(&server.state.config.authority_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load keys: {}", e))?;

        Ok(server)
    }

    /// Spawn a server that has never loaded keys. The authority has no
    /// routes mounted; tests mount whatever they need on [`Self::authority`].
    pub async fn spawn_without_keys() -> Result<Self, anyhow::Error> {
        Self::start(MockServer::start().await).await
    }

    async fn start(authority: MockServer) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            ("AUTHORITY_URL".to_string(), authority.uri()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("KEY_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let gate = Gate::with_fetcher(Arc::new(HttpFetcher::with_timeout(
            config.key_fetch_timeout(),
        )))
        .with_clock_skew(config.clock_skew());

        let state = Arc::new(AppState { gate, config });

        // Build routes using gate-service's real route builder
        let app = routes::build_routes(state.clone(), test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            authority,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The mocked identity authority.
    pub fn authority(&self) -> &MockServer {
        &self.authority
    }

    /// The gate used by the server's routes.
    pub fn gate(&self) -> &Gate {
        &self.state.gate
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.state.config
    }
}

impl Drop for TestGateServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released when the test ends
        self._handle.abort();
    }
}
