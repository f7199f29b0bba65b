//! Gate service configuration.
//!
//! Configuration is loaded from environment variables.

use scope_gate::key_store::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default key document fetch timeout in seconds.
pub const DEFAULT_KEY_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Maximum key document fetch timeout in seconds.
pub const MAX_KEY_FETCH_TIMEOUT_SECONDS: u64 = 120;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Maximum graceful shutdown drain period in seconds.
pub const MAX_DRAIN_SECONDS: u64 = 300;

/// Gate service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity authority base URL; keys are fetched from `{url}/token_keys`.
    pub authority_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// JWT clock skew tolerance in seconds for `exp`/`nbf` validation.
    pub jwt_clock_skew_seconds: u64,

    /// Timeout for fetching the key document, in seconds.
    pub key_fetch_timeout_seconds: u64,

    /// Time to keep serving in-flight requests after a shutdown signal (0 disables).
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid authority URL: {0}")]
    InvalidAuthorityUrl(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid key fetch timeout configuration: {0}")]
    InvalidKeyFetchTimeout(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let authority_url = vars
            .get("AUTHORITY_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTHORITY_URL".to_string()))?
            .trim()
            .to_string();

        if authority_url.is_empty() {
            return Err(ConfigError::InvalidAuthorityUrl(
                "AUTHORITY_URL must not be empty".to_string(),
            ));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwtClockSkew(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got 0".to_string(),
                ));
            }

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let key_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("KEY_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidKeyFetchTimeout(format!(
                        "KEY_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_KEY_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidKeyFetchTimeout(format!(
                        "KEY_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_KEY_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_KEY_FETCH_TIMEOUT_SECONDS
            };

        let drain_seconds = if let Some(value_str) = vars.get("GATE_DRAIN_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainPeriod(format!(
                    "GATE_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_DRAIN_SECONDS {
                return Err(ConfigError::InvalidDrainPeriod(format!(
                    "GATE_DRAIN_SECONDS must not exceed {} seconds, got {}",
                    MAX_DRAIN_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_DRAIN_SECONDS
        };

        Ok(Config {
            authority_url,
            bind_address,
            jwt_clock_skew_seconds,
            key_fetch_timeout_seconds,
            drain_seconds,
        })
    }

    /// Clock skew tolerance as a `Duration`.
    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.jwt_clock_skew_seconds)
    }

    /// Key document fetch timeout as a `Duration`.
    pub fn key_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.key_fetch_timeout_seconds)
    }

    /// Shutdown drain period as a `Duration`.
    pub fn drain_period(&self) -> Duration {
        Duration::from_secs(self.drain_seconds)
    }
}
