//! Error types for the scope gate.
//!
//! Load-time failures (`FetchError`, `KeyLoadError`) are returned to whoever
//! called `load_keys`. Request-time failures are represented by [`Denial`],
//! which always renders as the same bare 403 response. The variant only
//! shows up in logs and metrics.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure to retrieve a document from the identity authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The authority answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Failure to load the trusted key set.
///
/// Any of these aborts the load; the previously trusted keys (if any) stay
/// in place.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    /// The key document could not be fetched.
    #[error("key document fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The key document is not valid JSON of the expected shape.
    #[error("key document could not be parsed: {0}")]
    Parse(String),

    /// One entry's PEM value is not a usable verification key.
    #[error("key for algorithm {alg} is unusable: {reason}")]
    KeyFormat { alg: String, reason: String },
}

impl KeyLoadError {
    /// Bounded label for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            KeyLoadError::Fetch(_) => "fetch",
            KeyLoadError::Parse(_) => "parse",
            KeyLoadError::KeyFormat { .. } => "key_format",
        }
    }
}

/// Reason a protected request was refused.
///
/// Callers never see which variant fired: every denial is rendered as
/// `403 Forbidden` with an empty body.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Denial {
    #[error("no trusted keys are loaded")]
    KeysUnavailable,

    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header malformed")]
    MalformedHeader,

    #[error("token exceeds maximum size")]
    TokenTooLarge,

    #[error("token invalid or expired")]
    InvalidToken,

    #[error("token algorithm not trusted")]
    UnknownAlgorithm,

    #[error("token lacks a required scope")]
    MissingScope,
}

impl Denial {
    /// Bounded label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Denial::KeysUnavailable => "keys_unavailable",
            Denial::MissingHeader => "missing_header",
            Denial::MalformedHeader => "malformed_header",
            Denial::TokenTooLarge => "token_too_large",
            Denial::InvalidToken => "invalid_token",
            Denial::UnknownAlgorithm => "unknown_algorithm",
            Denial::MissingScope => "missing_scope",
        }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        StatusCode::FORBIDDEN.into_response()
    }
}

/// Errors from the identity authority client.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// Transport failure talking to the authority.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The authority refused the request.
    #[error("request rejected by authority: {0}")]
    Rejected(String),

    /// The authority's response body could not be decoded.
    #[error("invalid authority response: {0}")]
    InvalidResponse(String),

    /// Client-side configuration problem.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A token check was requested for an empty token.
    #[error("token is empty")]
    EmptyToken,
}
