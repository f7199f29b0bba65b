//! Observability for the gate service.
//!
//! Provides the Prometheus recorder, HTTP metric definitions, and helpers.
//! Authorization and key-load metrics are recorded by `scope_gate` itself.

pub mod metrics;
