//! HTTP request handlers for the gate service.

pub mod health;
pub mod keys;
pub mod metrics;
pub mod ping;

pub use health::{health_check, readiness_check};
pub use keys::{list_keys, reload_keys};
pub use metrics::metrics_handler;
pub use ping::ping;
