//! # Gate Test Utilities
//!
//! Shared test utilities for `scope-gate` and `gate-service`.
//!
//! This crate provides:
//! - Deterministic key fixtures (trusted/untrusted RSA pairs, seeded Ed25519)
//! - `TestTokenBuilder` for signed tokens
//! - `key_document` for authority key documents
//! - Canned fetchers for driving a `Gate` without a network
//! - Server test harness (`TestGateServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let gate = Gate::with_fetcher(Arc::new(CannedFetcher::new(
//!         key_document(&[("RS256", TRUSTED_RSA_PUBLIC_PEM)]),
//!     )));
//!     gate.load_keys("http://uaa").await.unwrap();
//!
//!     let token = TestTokenBuilder::new().with_scopes(&["admin"]).sign_rs256();
//! }
//! ```

pub mod fetchers;
pub mod fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use fetchers::*;
pub use fixtures::*;
pub use server_harness::*;
pub use token_builders::*;

use serde_json::json;

/// Build an authority key document from `(alg, pem)` pairs.
///
/// Entries carry the extra members a UAA-style authority publishes (`kid`,
/// `kty`, `use`) so consumers are exercised against realistic documents.
pub fn key_document(entries: &[(&str, &str)]) -> String {
    let keys: Vec<serde_json::Value> = entries
        .iter()
        .enumerate()
        .map(|(i, (alg, pem))| {
            json!({
                "kid": format!("key-{i}"),
                "kty": if alg.starts_with("Ed") { "OKP" } else if alg.starts_with("ES") { "EC" } else { "RSA" },
                "use": "sig",
                "alg": alg,
                "value": pem,
            })
        })
        .collect();

    json!({ "keys": keys }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_document_shape() {
        let body = key_document(&[("RS256", "pem-a"), ("EdDSA", "pem-b")]);
        let doc: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(doc["keys"][0]["alg"], "RS256");
        assert_eq!(doc["keys"][0]["value"], "pem-a");
        assert_eq!(doc["keys"][0]["kty"], "RSA");
        assert_eq!(doc["keys"][1]["alg"], "EdDSA");
        assert_eq!(doc["keys"][1]["kty"], "OKP");
    }

    #[test]
    fn test_empty_key_document() {
        assert_eq!(key_document(&[]), r#"{"keys":[]}"#);
    }
}
