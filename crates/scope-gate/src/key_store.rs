//! Trusted signing keys published by the identity authority.
//!
//! The authority serves a key document at `{authority}/token_keys`:
//!
//! ```json
//! {"keys": [{"alg": "RS256", "value": "-----BEGIN PUBLIC KEY-----\n..."}]}
//! ```
//!
//! # Security
//!
//! - Keys are indexed by algorithm identifier. A token is only ever verified
//!   with the key registered under the algorithm it declares, and only with
//!   that algorithm, so a key cannot be replayed under a different scheme.
//! - A load either commits a complete new key set or changes nothing.
//! - Readers take an `Arc` snapshot of one key set; a concurrent reload swaps
//!   the pointer and never mutates a published set.

use crate::claims::Claims;
use crate::errors::{Denial, KeyLoadError};
use crate::fetcher::BodyFetcher;
use crate::observability;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;

/// Maximum accepted token size in bytes (8KB).
///
/// Checked before any base64 decoding or signature work.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance applied to `exp` and `nbf`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Upper bound for configurable clock skew tolerance.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Key document served by the authority.
#[derive(Debug, Deserialize)]
struct KeyDocument {
    #[serde(default)]
    keys: Vec<KeyEntry>,
}

/// One published key. Other members (`kid`, `kty`, `n`, `e`, ...) are ignored.
///
/// A missing `value` decodes as empty and fails as an unusable key.
#[derive(Debug, Deserialize)]
struct KeyEntry {
    alg: String,
    #[serde(default)]
    value: String,
}

/// A verification key together with the identifier it was published under.
#[derive(Clone)]
struct TrustedKey {
    label: String,
    key: DecodingKey,
}

/// Token verification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Seconds of tolerance applied to `exp` and `nbf`.
    pub leeway_secs: u64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            leeway_secs: DEFAULT_CLOCK_SKEW.as_secs(),
        }
    }
}

/// An immutable, complete set of trusted keys.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<Algorithm, TrustedKey>,
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("KeySet")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}

impl KeySet {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Trusted algorithm identifiers, sorted.
    pub fn algorithms(&self) -> Vec<String> {
        let mut algorithms: Vec<String> = self.keys.values().map(|k| k.label.clone()).collect();
        algorithms.sort_unstable();
        algorithms
    }

    /// Verify `token` against this key set and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. Read the declared `alg` from the header
    /// 3. Resolve the key registered for exactly that algorithm
    /// 4. Verify the signature with that key and algorithm only
    /// 5. Validate `exp` and `nbf` with leeway, each only when present
    ///
    /// # Errors
    ///
    /// - `Denial::TokenTooLarge` - token exceeds `MAX_TOKEN_SIZE_BYTES`
    /// - `Denial::UnknownAlgorithm` - no key is trusted for the declared algorithm
    /// - `Denial::InvalidToken` - anything else (structure, signature, expiry)
    pub fn verify(&self, token: &str, options: &VerifyOptions) -> Result<Claims, Denial> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(
                target: "gate.authorize",
                reason = Denial::TokenTooLarge.as_str(),
                token_size = token.len(),
                max_size = MAX_TOKEN_SIZE_BYTES,
                "Request denied"
            );
            return Err(Denial::TokenTooLarge);
        }

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(
                target: "gate.authorize",
                reason = Denial::InvalidToken.as_str(),
                error = %e,
                "Request denied: token header could not be decoded"
            );
            Denial::InvalidToken
        })?;

        let trusted = self.keys.get(&header.alg).ok_or_else(|| {
            tracing::debug!(
                target: "gate.authorize",
                reason = Denial::UnknownAlgorithm.as_str(),
                alg = ?header.alg,
                "Request denied: no trusted key for token algorithm"
            );
            Denial::UnknownAlgorithm
        })?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = options.leeway_secs;
        // exp and nbf are checked when present but neither is mandatory
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Authorization is by scope, not audience
        validation.validate_aud = false;

        let token_data = decode::<Claims>(token, &trusted.key, &validation).map_err(|e| {
            tracing::debug!(
                target: "gate.authorize",
                reason = Denial::InvalidToken.as_str(),
                alg = %trusted.label,
                error = %e,
                "Request denied: token verification failed"
            );
            Denial::InvalidToken
        })?;

        Ok(token_data.claims)
    }
}

/// Parse a key document into a key set.
///
/// Parsing stops at the first unusable entry; no partial set is returned.
/// If the document repeats an algorithm, the last entry wins.
///
/// # Errors
///
/// - `KeyLoadError::Parse` - body is not JSON of the expected shape
/// - `KeyLoadError::KeyFormat` - an entry names an unsupported algorithm or
///   its PEM value is not a public key for that algorithm
pub fn parse_key_document(body: &str) -> Result<KeySet, KeyLoadError> {
    let document: KeyDocument =
        serde_json::from_str(body).map_err(|e| KeyLoadError::Parse(e.to_string()))?;

    let mut keys = HashMap::with_capacity(document.keys.len());
    for entry in document.keys {
        let algorithm = Algorithm::from_str(&entry.alg).map_err(|_| KeyLoadError::KeyFormat {
            alg: entry.alg.clone(),
            reason: "unrecognized algorithm identifier".to_string(),
        })?;

        let key = decoding_key(algorithm, entry.value.as_bytes()).map_err(|reason| {
            KeyLoadError::KeyFormat {
                alg: entry.alg.clone(),
                reason,
            }
        })?;

        keys.insert(
            algorithm,
            TrustedKey {
                label: entry.alg,
                key,
            },
        );
    }

    Ok(KeySet { keys })
}

/// Decode a PEM public key for `algorithm`.
fn decoding_key(algorithm: Algorithm, pem: &[u8]) -> Result<DecodingKey, String> {
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem).map_err(|e| e.to_string()),
        Algorithm::ES256 | Algorithm::ES384 => {
            DecodingKey::from_ec_pem(pem).map_err(|e| e.to_string())
        }
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem).map_err(|e| e.to_string()),
        // HMAC secrets are never published as verification keys
        _ => Err("not a public-key signature algorithm".to_string()),
    }
}

/// Holder of the currently trusted key set.
///
/// Starts uninitialized. Each successful [`KeyStore::load`] publishes a new
/// complete set.
pub struct KeyStore {
    fetcher: Arc<dyn BodyFetcher>,
    current: RwLock<Option<Arc<KeySet>>>,
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore").finish_non_exhaustive()
    }
}

impl KeyStore {
    /// Create an uninitialized store that loads documents through `fetcher`.
    pub fn new(fetcher: Arc<dyn BodyFetcher>) -> Self {
        Self {
            fetcher,
            current: RwLock::new(None),
        }
    }

    /// Fetch and trust the key document at `document_url`.
    ///
    /// Returns the number of trusted algorithms. On error the previously
    /// trusted set is left untouched.
    ///
    /// # Errors
    ///
    /// See [`KeyLoadError`].
    #[instrument(skip(self), fields(url = %document_url))]
    pub async fn load(&self, document_url: &str) -> Result<usize, KeyLoadError> {
        let key_set = match self.fetch_and_parse(document_url).await {
            Ok(key_set) => key_set,
            Err(e) => {
                tracing::error!(
                    target: "gate.key_store",
                    url = %document_url,
                    error = %e,
                    "Failed to load trusted keys"
                );
                observability::record_key_load("error", e.error_type());
                return Err(e);
            }
        };

        let count = key_set.len();
        let algorithms = key_set.algorithms();

        *self.current.write().await = Some(Arc::new(key_set));

        tracing::info!(
            target: "gate.key_store",
            key_count = count,
            algorithms = ?algorithms,
            "Trusted keys loaded"
        );
        if count == 0 {
            tracing::warn!(
                target: "gate.key_store",
                url = %document_url,
                "Key document contained no keys, all protected requests will be denied"
            );
        }
        observability::record_key_load("success", "none");
        observability::set_trusted_keys(count);

        Ok(count)
    }

    async fn fetch_and_parse(&self, document_url: &str) -> Result<KeySet, KeyLoadError> {
        let body = self.fetcher.fetch_body(document_url).await?;
        parse_key_document(&body)
    }

    /// Current key set, or `None` if nothing has been loaded yet.
    pub async fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current.read().await.clone()
    }

    /// Algorithms currently trusted (empty when uninitialized).
    pub async fn algorithms_supported(&self) -> Vec<String> {
        self.snapshot()
            .await
            .map(|set| set.algorithms())
            .unwrap_or_default()
    }

    /// Loaded and holding at least one key.
    pub async fn is_ready(&self) -> bool {
        self.snapshot().await.is_some_and(|set| !set.is_empty())
    }
}
