//! Metrics emitted by the gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gate_` prefix
//! - `_total` suffix for counters
//!
//! Recording goes through the `metrics` facade and is a no-op until the host
//! process installs a recorder.
//!
//! # Cardinality
//!
//! - `status`: 2 values (success, error)
//! - `error_type`: bounded by `KeyLoadError` variants plus "none"
//! - `outcome`: 2 values (granted, denied)
//! - `reason`: bounded by `Denial` variants plus "granted"

use metrics::{counter, gauge};

/// Record a key load attempt.
///
/// Metric: `gate_key_loads_total`
/// Labels: `status`, `error_type`
pub fn record_key_load(status: &'static str, error_type: &'static str) {
    counter!(
        "gate_key_loads_total",
        "status" => status,
        "error_type" => error_type,
    )
    .increment(1);
}

/// Record how many algorithms are trusted after a successful load.
///
/// Metric: `gate_trusted_keys`
#[allow(clippy::cast_precision_loss)]
pub fn set_trusted_keys(count: usize) {
    gauge!("gate_trusted_keys").set(count as f64);
}

/// Record the outcome of one protected request.
///
/// Metric: `gate_decisions_total`
/// Labels: `outcome`, `reason`
pub fn record_decision(outcome: &'static str, reason: &'static str) {
    counter!(
        "gate_decisions_total",
        "outcome" => outcome,
        "reason" => reason,
    )
    .increment(1);
}
