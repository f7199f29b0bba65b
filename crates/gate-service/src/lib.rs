//! Gate Service Library
//!
//! Reference HTTP service built on `scope_gate`. It trusts the keys published
//! by an identity authority and exposes:
//!
//! - Liveness, readiness, and Prometheus endpoints
//! - Operator endpoints to list and reload trusted keys (scope `gate.admin`)
//! - A ping endpoint that accepts any validly signed token
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Response bodies
//! - `observability` - Prometheus recorder and HTTP metrics
//! - `routes` - Axum router setup

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
