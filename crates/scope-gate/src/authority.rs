//! Client for the identity authority.
//!
//! Covers the calls a service makes as an OAuth client of the authority:
//!
//! - `fetch_token` - client credentials grant against `/oauth/token`
//! - `check_token` - ask `/check_token` whether a token is still accepted
//! - `update_client_authorities` / `reset_client_authorities` - replace the
//!   authorities of another registered client via `/oauth/clients/{id}`
//!
//! None of these calls is on the request path of [`crate::Gate`]; protected
//! endpoints verify tokens locally against the loaded key set.
//!
//! # Security
//!
//! - The client secret is held as `SecretString` and sent only as HTTP Basic
//!   credentials
//! - Issued access tokens are returned as `SecretString`
//! - Use [`AuthorityClientConfig::new_secure`] to refuse non-HTTPS authorities

use crate::errors::AuthorityError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Default HTTP timeout for authority calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Authorities a client is left with after [`AuthorityClient::reset_client_authorities`].
pub const MINIMAL_CLIENT_AUTHORITIES: &[&str] = &["uaa.resource"];

/// Configuration for [`AuthorityClient`].
#[derive(Clone)]
pub struct AuthorityClientConfig {
    /// Authority base URL (e.g., `https://uaa.example.com`).
    pub authority_url: String,

    /// OAuth client ID.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: SecretString,

    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl std::fmt::Debug for AuthorityClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityClientConfig")
            .field("authority_url", &self.authority_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl AuthorityClientConfig {
    /// Create a configuration with the default timeout.
    ///
    /// Credentials travel in plain text over HTTP; prefer
    /// [`AuthorityClientConfig::new_secure`] outside of tests.
    #[must_use]
    pub fn new(authority_url: String, client_id: String, client_secret: SecretString) -> Self {
        Self {
            authority_url,
            client_id,
            client_secret,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Create a configuration requiring HTTPS.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::Configuration` if the URL doesn't use HTTPS.
    pub fn new_secure(
        authority_url: String,
        client_id: String,
        client_secret: SecretString,
    ) -> Result<Self, AuthorityError> {
        if !authority_url.starts_with("https://") {
            return Err(AuthorityError::Configuration(
                "authority URL must use HTTPS".into(),
            ));
        }
        Ok(Self::new(authority_url, client_id, client_secret))
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

/// Token issued by the authority.
pub struct TokenResponse {
    pub access_token: SecretString,
    pub token_type: String,
    pub refresh_token: Option<SecretString>,
    pub expires_in: u64,
    pub scope: Option<String>,
    pub jti: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("jti", &self.jti)
            .finish()
    }
}

/// Wire shape of a successful token response.
#[derive(Deserialize)]
struct RawTokenResponse {
    access_token: String,
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    jti: Option<String>,
}

impl From<RawTokenResponse> for TokenResponse {
    fn from(raw: RawTokenResponse) -> Self {
        Self {
            access_token: SecretString::from(raw.access_token),
            token_type: raw.token_type,
            refresh_token: raw.refresh_token.map(SecretString::from),
            expires_in: raw.expires_in,
            scope: raw.scope,
            jti: raw.jti,
        }
    }
}

/// OAuth error body (`{"error": "...", "error_description": "..."}`).
#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Body of a client authorities update.
#[derive(Serialize)]
struct ClientAuthoritiesUpdate<'a> {
    client_id: &'a str,
    authorities: &'a [&'a str],
}

/// Outcome of a token check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    /// The authority accepted the token.
    Active,
    /// The authority refused the token with `status`.
    Rejected { status: u16 },
}

impl TokenCheck {
    pub fn is_active(&self) -> bool {
        matches!(self, TokenCheck::Active)
    }
}

/// HTTP client for the identity authority.
#[derive(Clone)]
pub struct AuthorityClient {
    config: AuthorityClientConfig,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for AuthorityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthorityClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: AuthorityClientConfig) -> Result<Self, AuthorityError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(config.http_timeout))
            .build()
            .map_err(|e| {
                AuthorityError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.authority_url.trim_end_matches('/'), path)
    }

    /// Obtain an access token with the client credentials grant.
    ///
    /// # Errors
    ///
    /// - `AuthorityError::Http` - the request could not be completed
    /// - `AuthorityError::Rejected` - the authority returned an OAuth error or
    ///   a non-success status
    /// - `AuthorityError::InvalidResponse` - the body is not a token response
    #[instrument(skip_all, fields(client_id = %self.config.client_id))]
    pub async fn fetch_token(&self) -> Result<TokenResponse, AuthorityError> {
        let url = self.endpoint("/oauth/token");

        tracing::debug!(target: "gate.authority", url = %url, "Requesting token from authority");

        let form_body = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&form_body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "gate.authority", error = %e, "Token request failed");
                AuthorityError::Http(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::warn!(target: "gate.authority", error = %e, "Failed to read token response");
            AuthorityError::Http(e.to_string())
        })?;

        // The authority may report OAuth errors with any status
        if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorBody>(&body) {
            tracing::warn!(
                target: "gate.authority",
                status = %status,
                error = %oauth_error.error,
                "Authority rejected token request"
            );
            return Err(AuthorityError::Rejected(
                oauth_error.error_description.unwrap_or(oauth_error.error),
            ));
        }

        if !status.is_success() {
            tracing::warn!(
                target: "gate.authority",
                status = %status,
                "Unexpected response from authority"
            );
            return Err(AuthorityError::Rejected(format!("Status {status}")));
        }

        let raw: RawTokenResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(target: "gate.authority", error = %e, "Failed to parse token response");
            AuthorityError::InvalidResponse(e.to_string())
        })?;

        tracing::debug!(
            target: "gate.authority",
            expires_in_secs = raw.expires_in,
            "Token acquired"
        );

        Ok(raw.into())
    }

    /// Ask the authority whether `token` is still accepted.
    ///
    /// # Errors
    ///
    /// - `AuthorityError::EmptyToken` - `token` is empty; nothing is sent
    /// - `AuthorityError::Http` - the request could not be completed
    #[instrument(skip_all)]
    pub async fn check_token(&self, token: &str) -> Result<TokenCheck, AuthorityError> {
        if token.is_empty() {
            return Err(AuthorityError::EmptyToken);
        }

        let url = self.endpoint("/check_token");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "gate.authority", error = %e, "Token check request failed");
                AuthorityError::Http(e.to_string())
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            tracing::debug!(target: "gate.authority", "Authority accepted token");
            Ok(TokenCheck::Active)
        } else {
            tracing::debug!(target: "gate.authority", status = %status, "Authority rejected token");
            Ok(TokenCheck::Rejected {
                status: status.as_u16(),
            })
        }
    }

    /// Replace the authorities of the registered client `client_id`.
    ///
    /// Authenticates with a token from [`AuthorityClient::fetch_token`], then
    /// sends `PUT /oauth/clients/{client_id}`. The configured client must hold
    /// the authority's client administration scope.
    ///
    /// # Errors
    ///
    /// - Any error from [`AuthorityClient::fetch_token`]; no update is sent
    /// - `AuthorityError::Configuration` - `client_id` is empty
    /// - `AuthorityError::Http` - the update request could not be completed
    /// - `AuthorityError::Rejected` - the authority answered with an OAuth
    ///   error or a non-success status
    #[instrument(skip_all, fields(target_client_id = %client_id))]
    pub async fn update_client_authorities(
        &self,
        client_id: &str,
        authorities: &[&str],
    ) -> Result<(), AuthorityError> {
        if client_id.is_empty() {
            return Err(AuthorityError::Configuration(
                "client ID to update must not be empty".into(),
            ));
        }

        let token = self.fetch_token().await?;
        let url = self.endpoint(&format!("/oauth/clients/{client_id}"));

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(token.access_token.expose_secret())
            .json(&ClientAuthoritiesUpdate {
                client_id,
                authorities,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "gate.authority", error = %e, "Client authorities update failed");
                AuthorityError::Http(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                target: "gate.authority",
                authorities = ?authorities,
                "Client authorities updated"
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let reason = match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(oauth_error) => oauth_error.error_description.unwrap_or(oauth_error.error),
            Err(_) => format!("Status {status}"),
        };

        tracing::warn!(
            target: "gate.authority",
            status = %status,
            reason = %reason,
            "Authority rejected client authorities update"
        );
        Err(AuthorityError::Rejected(reason))
    }

    /// Reset the authorities of `client_id` to [`MINIMAL_CLIENT_AUTHORITIES`].
    ///
    /// # Errors
    ///
    /// See [`AuthorityClient::update_client_authorities`].
    pub async fn reset_client_authorities(&self, client_id: &str) -> Result<(), AuthorityError> {
        self.update_client_authorities(client_id, MINIMAL_CLIENT_AUTHORITIES)
            .await
    }
}
