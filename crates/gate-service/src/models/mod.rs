//! Response bodies for the gate service.

use serde::Serialize;

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Algorithms currently trusted; omitted when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_algorithms: Option<Vec<String>>,
}

/// Trusted key listing.
#[derive(Debug, Serialize)]
pub struct KeysResponse {
    pub algorithms: Vec<String>,
}
