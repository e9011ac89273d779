//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and addresses. All errors are
//! collected so an operator sees every problem in one pass.

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("unknown log level {0:?}")]
    UnknownLogLevel(String),

    #[error(
        "timeouts.request_secs ({request_ms} ms) must exceed the worst-case candidate loop ({loop_ms} ms)"
    )]
    RequestDeadlineTooShort { request_ms: u64, loop_ms: u64 },
}

/// Most candidates a single request can attempt (HTTPS, then HTTP).
const MAX_CANDIDATES: u64 = 2;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let positive: [(&'static str, u64); 7] = [
        ("listener.max_connections", config.listener.max_connections as u64),
        ("upstream.attempt_timeout_ms", config.upstream.attempt_timeout_ms),
        ("upstream.connect_timeout_ms", config.upstream.connect_timeout_ms),
        ("upstream.read_idle_timeout_ms", config.upstream.read_idle_timeout_ms),
        ("upstream.max_body_bytes", config.upstream.max_body_bytes),
        ("upstream.channel_capacity", config.upstream.channel_capacity as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    let loop_ms = config
        .upstream
        .attempt_timeout_ms
        .saturating_mul(MAX_CANDIDATES);
    if request_ms != 0 && request_ms <= loop_ms {
        errors.push(ValidationError::RequestDeadlineTooShort {
            request_ms,
            loop_ms,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
