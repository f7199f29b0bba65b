//! Token check endpoint.

/// Handler for GET /api/v1/ping
///
/// Registered behind the gate with no required scopes, so any validly signed,
/// unexpired token gets through.
pub async fn ping() -> &'static str {
    "pong"
}
