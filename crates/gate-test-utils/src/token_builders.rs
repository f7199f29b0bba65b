//! Builder for signed test tokens.
//!
//! Produces compact JWTs the way the authority would: RS256 with the trusted
//! RSA key by default, or EdDSA / any other key on request.

use crate::fixtures::{ed25519_private_pkcs8, TRUSTED_RSA_PRIVATE_PEM};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Key id the authority's legacy key is published under.
pub const TEST_KEY_ID: &str = "legacy-token-key";

/// Builder for test token claims.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("reporting-job")
///     .with_scopes(&["reports.read"])
///     .expires_in(300)
///     .sign_rs256();
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Claims with a subject, `iat`, `exp` one hour out, and no scopes.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-client"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("scope".to_string(), json!([]));
        Self { claims }
    }

    /// Set the subject.
    pub fn for_subject(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the scope claim to an array of strings.
    pub fn with_scopes(self, scopes: &[&str]) -> Self {
        self.with_claim("scope", json!(scopes))
    }

    /// Set the scope claim to an arbitrary JSON value.
    pub fn with_scope_value(self, value: Value) -> Self {
        self.with_claim("scope", value)
    }

    /// Remove the scope claim entirely.
    pub fn without_scope(self) -> Self {
        self.without_claim("scope")
    }

    /// Set `exp` relative to now (negative for an already expired token).
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Remove `exp`.
    pub fn without_expiry(self) -> Self {
        self.without_claim("exp")
    }

    /// Set `nbf` relative to now.
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("nbf", json!(nbf))
    }

    /// Set any claim.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value.
    pub fn build(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with the trusted RSA key (RS256).
    pub fn sign_rs256(&self) -> String {
        self.sign_rsa(Algorithm::RS256, TRUSTED_RSA_PRIVATE_PEM)
    }

    /// Sign with an RSA private key PEM using `alg` (RS* or PS*).
    pub fn sign_rsa(&self, alg: Algorithm, private_pem: &str) -> String {
        let key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .expect("Failed to parse RSA private key");
        self.sign_with(alg, &key)
    }

    /// Sign with the deterministic Ed25519 key for `seed` (EdDSA).
    pub fn sign_eddsa(&self, seed: u8) -> String {
        let key = EncodingKey::from_ed_der(&ed25519_private_pkcs8(seed));
        self.sign_with(Algorithm::EdDSA, &key)
    }

    /// Sign with any key and algorithm.
    pub fn sign_with(&self, alg: Algorithm, key: &EncodingKey) -> String {
        let mut header = Header::new(alg);
        header.typ = Some("JWT".to_string());
        header.kid = Some(TEST_KEY_ID.to_string());

        encode(&header, &self.build(), key).expect("Failed to sign token")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
