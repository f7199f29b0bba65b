//! Scope-based authorization for axum handlers.
//!
//! A [`Gate`] owns the trusted key set and wraps handlers so that they only
//! run for requests carrying a valid bearer token with every required scope:
//!
//! ```rust,ignore
//! let gate = Gate::new();
//! gate.load_keys("https://uaa.example.com").await?;
//!
//! let app = Router::new()
//!     .route("/admin", get(gate.protect(["admin"], admin_handler)))
//!     .route("/me", get(gate.protect(RequiredScopes::none(), me_handler)));
//! ```
//!
//! Every refusal is the same bare `403 Forbidden`; the reason only appears in
//! logs and metrics.

use crate::errors::{Denial, KeyLoadError};
use crate::fetcher::{BodyFetcher, HttpFetcher};
use crate::key_store::{KeySet, KeyStore, VerifyOptions, MAX_CLOCK_SKEW};
use crate::observability;
use crate::scopes::RequiredScopes;
use axum::extract::Request;
use axum::handler::Handler;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Path of the key document relative to the authority URL.
const TOKEN_KEYS_PATH: &str = "/token_keys";

/// Authorization gate for protected endpoints.
///
/// Cheap to clone; clones share the same key store, so a reload through any
/// clone is seen by every handler produced by [`Gate::protect`].
#[derive(Debug, Clone)]
pub struct Gate {
    key_store: Arc<KeyStore>,
    options: VerifyOptions,
}

impl Gate {
    /// Create a gate that fetches keys over HTTP with default timeouts.
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(HttpFetcher::new()))
    }

    /// Create a gate that fetches keys through `fetcher`.
    pub fn with_fetcher(fetcher: Arc<dyn BodyFetcher>) -> Self {
        Self {
            key_store: Arc::new(KeyStore::new(fetcher)),
            options: VerifyOptions::default(),
        }
    }

    /// Set the clock skew tolerance for `exp` and `nbf`, capped at
    /// [`MAX_CLOCK_SKEW`].
    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        if skew > MAX_CLOCK_SKEW {
            tracing::warn!(
                target: "gate.authorize",
                requested_secs = skew.as_secs(),
                max_secs = MAX_CLOCK_SKEW.as_secs(),
                "Clock skew exceeds maximum, capping"
            );
        }
        self.options.leeway_secs = skew.min(MAX_CLOCK_SKEW).as_secs();
        self
    }

    /// Current verification settings.
    pub fn verify_options(&self) -> VerifyOptions {
        self.options
    }

    /// Load the authority's signing keys from `{authority_url}/token_keys`.
    ///
    /// Until the first successful call every protected request is denied.
    /// Calling it again rotates keys; a failed reload keeps the previous set.
    ///
    /// # Errors
    ///
    /// See [`KeyLoadError`].
    pub async fn load_keys(&self, authority_url: &str) -> Result<usize, KeyLoadError> {
        self.key_store.load(&key_document_url(authority_url)).await
    }

    /// Wrap `handler` so it only runs for requests that pass authorization.
    ///
    /// The gate itself is not modified; the returned handler can be registered
    /// on any axum route. The inner handler receives the original request
    /// untouched.
    pub fn protect<H, T>(&self, required: impl Into<RequiredScopes>, handler: H) -> Protected<H, T> {
        Protected {
            gate: self.clone(),
            required: Arc::new(required.into()),
            inner: handler,
            _marker: PhantomData,
        }
    }

    /// Decide whether a request with `headers` may reach a handler that
    /// requires `required`.
    ///
    /// # Errors
    ///
    /// Returns the [`Denial`] for the first failing check. Every variant maps
    /// to the same HTTP response.
    #[instrument(skip_all, name = "gate.authorize")]
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required: &RequiredScopes,
    ) -> Result<(), Denial> {
        let decision = self.decide(headers, required).await;

        match decision {
            Ok(()) => observability::record_decision("granted", "granted"),
            Err(denial) => observability::record_decision("denied", denial.as_str()),
        }

        decision
    }

    async fn decide(&self, headers: &HeaderMap, required: &RequiredScopes) -> Result<(), Denial> {
        // One snapshot per request; a concurrent reload cannot mix key sets
        let key_set = match self.key_store.snapshot().await {
            Some(set) if !set.is_empty() => set,
            _ => {
                tracing::error!(
                    target: "gate.authorize",
                    reason = Denial::KeysUnavailable.as_str(),
                    "Request denied: no trusted keys loaded"
                );
                return Err(Denial::KeysUnavailable);
            }
        };

        let token = extract_bearer_token(headers)?;
        let claims = key_set.verify(token, &self.options)?;

        if let Some(missing) = required.first_missing(&claims) {
            tracing::debug!(
                target: "gate.authorize",
                reason = Denial::MissingScope.as_str(),
                missing_scope = %missing,
                "Request denied: token lacks required scope"
            );
            return Err(Denial::MissingScope);
        }

        tracing::debug!(
            target: "gate.authorize",
            required_scopes = required.as_slice().len(),
            "Request authorized"
        );
        Ok(())
    }

    /// The key set currently trusted, or `None` before the first load.
    ///
    /// The returned set is immutable; later reloads do not affect it.
    pub async fn key_set(&self) -> Option<Arc<KeySet>> {
        self.key_store.snapshot().await
    }

    /// Algorithms currently trusted, sorted.
    pub async fn algorithms_supported(&self) -> Vec<String> {
        self.key_store.algorithms_supported().await
    }

    /// Whether at least one trusted key is loaded.
    pub async fn is_ready(&self) -> bool {
        self.key_store.is_ready().await
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

fn key_document_url(authority_url: &str) -> String {
    format!("{}{}", authority_url.trim_end_matches('/'), TOKEN_KEYS_PATH)
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The header must split on single spaces into exactly two parts, the first
/// being `Bearer` in any letter case.
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, Denial> {
    let value = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::debug!(
            target: "gate.authorize",
            reason = Denial::MissingHeader.as_str(),
            "Request denied: missing Authorization header"
        );
        Denial::MissingHeader
    })?;

    let value = value.to_str().map_err(|_| {
        tracing::debug!(
            target: "gate.authorize",
            reason = Denial::MalformedHeader.as_str(),
            "Request denied: Authorization header is not visible ASCII"
        );
        Denial::MalformedHeader
    })?;

    if value.is_empty() {
        tracing::debug!(
            target: "gate.authorize",
            reason = Denial::MissingHeader.as_str(),
            "Request denied: empty Authorization header"
        );
        return Err(Denial::MissingHeader);
    }

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => Ok(*token),
        _ => {
            tracing::debug!(
                target: "gate.authorize",
                reason = Denial::MalformedHeader.as_str(),
                parts = parts.len(),
                "Request denied: invalid Authorization header format"
            );
            Err(Denial::MalformedHeader)
        }
    }
}

/// A handler guarded by a [`Gate`].
///
/// Produced by [`Gate::protect`]. Implements [`Handler`] so it can be passed
/// to `get`, `post`, and the other axum routing methods.
pub struct Protected<H, T> {
    gate: Gate,
    required: Arc<RequiredScopes>,
    inner: H,
    _marker: PhantomData<fn() -> T>,
}

impl<H, T> Protected<H, T> {
    /// Scopes this handler requires.
    pub fn required_scopes(&self) -> &RequiredScopes {
        &self.required
    }
}

impl<H: Clone, T> Clone for Protected<H, T> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            required: Arc::clone(&self.required),
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<H, T, S> Handler<T, S> for Protected<H, T>
where
    H: Handler<T, S>,
    T: 'static,
    S: Send + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, req: Request, state: S) -> Self::Future {
        Box::pin(async move {
            // Only the head is inspected; the body is handed on unread
            let (parts, body) = req.into_parts();
            let decision = self.gate.authorize(&parts.headers, &self.required).await;

            match decision {
                Ok(()) => {
                    self.inner
                        .call(Request::from_parts(parts, body), state)
                        .await
                }
                Err(denial) => denial.into_response(),
            }
        })
    }
}
