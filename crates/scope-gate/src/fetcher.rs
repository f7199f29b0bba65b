//! Fetch capability used to retrieve the authority's key document.
//!
//! The gate never talks to the network directly; it goes through a
//! [`BodyFetcher`]. Production code uses [`HttpFetcher`]. Tests can pass any
//! `Fn(&str) -> Result<String, FetchError>` closure as a canned responder.

use crate::errors::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// Default timeout for a whole key-document request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// "Given a URL, return the response body as text or fail."
#[async_trait]
pub trait BodyFetcher: Send + Sync {
    /// Fetch `url` and return its body.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Status` for non-success responses and
    /// `FetchError::Transport` for anything that prevented a response.
    async fn fetch_body(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<F> BodyFetcher for F
where
    F: Fn(&str) -> Result<String, FetchError> + Send + Sync,
{
    async fn fetch_body(&self, url: &str) -> Result<String, FetchError> {
        self(url)
    }
}

/// HTTP GET fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gate.fetcher", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { http_client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BodyFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_body(&self, url: &str) -> Result<String, FetchError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::debug!(target: "gate.fetcher", error = %e, "HTTP request failed");
            FetchError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::debug!(target: "gate.fetcher", status = %status, "Unexpected response status");
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            tracing::debug!(target: "gate.fetcher", error = %e, "Failed to read response body");
            FetchError::Transport(e.to_string())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_fetcher_returns_body_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token_keys"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"keys":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let body = fetcher
            .fetch_body(&format!("{}/token_keys", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, r#"{"keys":[]}"#);
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token_keys"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = HttpFetcher::new()
            .fetch_body(&format!("{}/token_keys", server.uri()))
            .await;

        assert_eq!(result, Err(FetchError::Status(503)));
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_non_200_success() {
        // Only 200 carries a key document; 204 has nothing to parse
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = HttpFetcher::new().fetch_body(&server.uri()).await;

        assert_eq!(result, Err(FetchError::Status(204)));
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let result = HttpFetcher::with_timeout(Duration::from_millis(200))
            .fetch_body(&server.uri())
            .await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_http_fetcher_connection_refused() {
        // Port 1 is reserved and not listening
        let result = HttpFetcher::with_timeout(Duration::from_secs(2))
            .fetch_body("http://127.0.0.1:1/token_keys")
            .await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_closure_acts_as_fetcher() {
        let fetcher = |url: &str| -> Result<String, FetchError> {
            if url.ends_with("/token_keys") {
                Ok("canned".to_string())
            } else {
                Err(FetchError::Status(404))
            }
        };

        assert_eq!(
            fetcher.fetch_body("http://uaa/token_keys").await.unwrap(),
            "canned"
        );
        assert_eq!(
            fetcher.fetch_body("http://uaa/other").await,
            Err(FetchError::Status(404))
        );
    }
}
