//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the image proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the image proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Upstream fetch settings (timeouts, byte ceiling, redirects).
    pub upstream: UpstreamConfig,

    /// Cache-Control lifetimes for served responses.
    pub cache: CacheConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrently handled requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Upstream fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-candidate attempt timeout in milliseconds. Covers connect, response
    /// headers and the initial bytes used for sniffing.
    pub attempt_timeout_ms: u64,

    /// TCP/TLS connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Maximum time to wait for the next body chunk once streaming started.
    pub read_idle_timeout_ms: u64,

    /// Hard ceiling on bytes forwarded for a single image.
    pub max_body_bytes: u64,

    /// Maximum redirects followed per attempt (0 disables redirects).
    pub max_redirects: usize,

    /// User-Agent sent to upstreams.
    pub user_agent: String,

    /// Chunks buffered between the upstream reader and the client writer.
    pub channel_capacity: usize,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for upstream requests.
    pub use_env_proxy: bool,
}

impl UpstreamConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.read_idle_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 5_000,
            connect_timeout_ms: 5_000,
            read_idle_timeout_ms: 5_000,
            max_body_bytes: 5_000_000,
            max_redirects: 5,
            user_agent: concat!("image-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            channel_capacity: 8,
            use_env_proxy: true,
        }
    }
}

/// Cache-Control lifetimes in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime for versioned (`?v=`) upstream URLs. Also used as `s-maxage`.
    pub strong_max_age_secs: u64,

    /// Lifetime for unversioned upstream URLs.
    pub weak_max_age_secs: u64,

    /// Background revalidation window for unversioned upstream URLs.
    pub weak_stale_while_revalidate_secs: u64,

    /// Lifetime of the placeholder served on failure.
    pub fallback_max_age_secs: u64,

    /// Background revalidation window for the placeholder.
    pub fallback_stale_while_revalidate_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strong_max_age_secs: 31_536_000,
            weak_max_age_secs: 86_400,
            weak_stale_while_revalidate_secs: 604_800,
            fallback_max_age_secs: 300,
            fallback_stale_while_revalidate_secs: 3_600,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed until response headers are produced, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
