//! Gate service integration tests.
//!
//! Drives the real router through `TestGateServer`, with a mocked identity
//! authority publishing the trusted RS256 and EdDSA keys.

use gate_service::routes::ADMIN_SCOPE;
use gate_test_utils::{
    key_document, TestGateServer, TestTokenBuilder, TRUSTED_RSA_PUBLIC_PEM,
    UNTRUSTED_RSA_PRIVATE_PEM,
};
use jsonwebtoken::Algorithm;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn admin_token() -> String {
    TestTokenBuilder::new()
        .for_subject("operator")
        .with_scopes(&[ADMIN_SCOPE])
        .sign_rs256()
}

#[tokio::test]
async fn test_health_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_ready_lists_trusted_algorithms() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["trusted_algorithms"], serde_json::json!(["EdDSA", "RS256"]));
    Ok(())
}

#[tokio::test]
async fn test_ready_returns_503_before_keys_load() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn_without_keys().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert!(body.get("trusted_algorithms").is_none());
    Ok(())
}

#[tokio::test]
async fn test_ready_returns_503_for_empty_key_document() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn_with_key_document(key_document(&[])).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), 503);
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/nonexistent", server.url())).await?;

    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_list_keys_with_admin_scope() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/keys", server.url()))
        .bearer_auth(admin_token())
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({"algorithms": ["EdDSA", "RS256"]}));
    Ok(())
}

#[tokio::test]
async fn test_list_keys_without_token_is_bare_403() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/keys", server.url())).await?;

    assert_eq!(response.status(), 403);
    assert_eq!(response.text().await?, "");
    Ok(())
}

#[tokio::test]
async fn test_list_keys_without_admin_scope_is_403() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let token = TestTokenBuilder::new()
        .with_scopes(&["gate.read", "openid"])
        .sign_rs256();

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/keys", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    assert_eq!(response.text().await?, "");
    Ok(())
}

#[tokio::test]
async fn test_denials_are_indistinguishable() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/keys", server.url());

    let expired = TestTokenBuilder::new()
        .with_scopes(&[ADMIN_SCOPE])
        .expires_in(-3600)
        .sign_rs256();
    let untrusted = TestTokenBuilder::new()
        .with_scopes(&[ADMIN_SCOPE])
        .sign_rsa(Algorithm::RS256, UNTRUSTED_RSA_PRIVATE_PEM);

    let requests = vec![
        client.get(&url),
        client.get(&url).header("Authorization", "Basic abc"),
        client.get(&url).header("Authorization", "Bearer"),
        client.get(&url).bearer_auth("not-a-jwt"),
        client.get(&url).bearer_auth(expired),
        client.get(&url).bearer_auth(untrusted),
    ];

    for request in requests {
        let response = request.send().await?;
        assert_eq!(response.status(), 403);
        assert!(response.headers().get("content-type").is_none());
        assert_eq!(response.text().await?, "");
    }
    Ok(())
}

#[tokio::test]
async fn test_ping_accepts_any_valid_token() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let client = reqwest::Client::new();

    let rs256 = TestTokenBuilder::new().without_scope().sign_rs256();
    let eddsa = TestTokenBuilder::new()
        .with_scopes(&["openid"])
        .sign_eddsa(gate_test_utils::AUTHORITY_ED25519_SEED);

    for token in [rs256, eddsa] {
        let response = client
            .get(format!("{}/api/v1/ping", server.url()))
            .bearer_auth(token)
            .send()
            .await?;

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "pong");
    }
    Ok(())
}

#[tokio::test]
async fn test_ping_rejects_eddsa_token_from_other_key() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let token = TestTokenBuilder::new().sign_eddsa(99);

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/ping", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    Ok(())
}

#[tokio::test]
async fn test_protected_routes_deny_before_keys_load() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn_without_keys().await?;

    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/ping", server.url()))
        .bearer_auth(admin_token())
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    Ok(())
}

#[tokio::test]
async fn test_reload_rotates_keys() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let client = reqwest::Client::new();

    // Authority now publishes only the RSA key
    server.authority().reset().await;
    Mock::given(method("GET"))
        .and(path("/token_keys"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(key_document(&[("RS256", TRUSTED_RSA_PUBLIC_PEM)])),
        )
        .mount(server.authority())
        .await;

    let response = client
        .post(format!("{}/api/v1/keys/reload", server.url()))
        .bearer_auth(admin_token())
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["algorithms"], serde_json::json!(["RS256"]));

    // EdDSA tokens are no longer trusted
    let eddsa = TestTokenBuilder::new().sign_eddsa(gate_test_utils::AUTHORITY_ED25519_SEED);
    let response = client
        .get(format!("{}/api/v1/ping", server.url()))
        .bearer_auth(eddsa)
        .send()
        .await?;
    assert_eq!(response.status(), 403);
    Ok(())
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_keys() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let client = reqwest::Client::new();

    server.authority().reset().await;
    Mock::given(method("GET"))
        .and(path("/token_keys"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure detail"))
        .mount(server.authority())
        .await;

    let response = client
        .post(format!("{}/api/v1/keys/reload", server.url()))
        .bearer_auth(admin_token())
        .send()
        .await?;

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(body["error"]["message"], "Service temporarily unavailable");
    assert!(!body.to_string().contains("internal failure detail"));

    assert_eq!(
        server.gate().algorithms_supported().await,
        vec!["EdDSA", "RS256"]
    );

    let response = client
        .get(format!("{}/api/v1/ping", server.url()))
        .bearer_auth(admin_token())
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_reload_requires_admin_scope() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let token = TestTokenBuilder::new().with_scopes(&["openid"]).sign_rs256();

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/keys/reload", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    // Only the initial load reached the authority
    assert_eq!(
        server
            .authority()
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or_default(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_requests_are_counted_in_metrics() -> Result<(), anyhow::Error> {
    let server = TestGateServer::spawn().await?;
    let client = reqwest::Client::new();

    client
        .get(format!("{}/api/v1/ping", server.url()))
        .send()
        .await?;

    let body = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?
        .text()
        .await?;

    assert!(body.contains("gate_http_requests_total"));
    Ok(())
}
