//! Scope Gate
//!
//! Authorization gate for HTTP services that trust an OAuth identity
//! authority (UAA-style). The gate:
//!
//! - Loads the authority's published signing keys from `/token_keys`
//! - Verifies bearer tokens locally against the algorithm-indexed key set
//! - Admits a request only if the token carries every required scope
//! - Answers every refusal with the same empty `403 Forbidden`
//!
//! # Usage
//!
//! ```rust,ignore
//! use scope_gate::Gate;
//!
//! let gate = Gate::new();
//! gate.load_keys("https://uaa.example.com").await?;
//!
//! let app = Router::new().route("/reports", get(gate.protect(["reports.read"], reports)));
//! ```
//!
//! # Modules
//!
//! - `authority` - OAuth client for the identity authority
//! - `claims` - Token claim set
//! - `errors` - Load-time errors and request-time denials
//! - `fetcher` - Pluggable key-document fetch capability
//! - `gate` - `Gate` and the `Protected` handler wrapper
//! - `key_store` - Trusted key set and token verification
//! - `observability` - Metric recording helpers
//! - `scopes` - Required scope sets

pub mod authority;
pub mod claims;
pub mod errors;
pub mod fetcher;
pub mod gate;
pub mod key_store;
pub mod observability;
pub mod scopes;

pub use authority::{AuthorityClient, AuthorityClientConfig, TokenCheck, TokenResponse};
pub use claims::Claims;
pub use errors::{AuthorityError, Denial, FetchError, KeyLoadError};
pub use fetcher::{BodyFetcher, HttpFetcher};
pub use gate::{Gate, Protected};
pub use key_store::{parse_key_document, KeySet, KeyStore, VerifyOptions};
pub use scopes::RequiredScopes;
