//! Error types for the fetch pipeline.

use std::time::Duration;

use axum::http::StatusCode;

/// Why a single candidate could not be used.
///
/// Every variant is recovered by advancing to the next candidate.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(StatusCode),

    #[error("declared content length {declared} exceeds limit {limit}")]
    DeclaredTooLarge { declared: u64, limit: u64 },

    #[error("upstream sent an empty body")]
    EmptyBody,

    #[error("initial chunk of {size} bytes exceeds limit {limit}")]
    InitialChunkTooLarge { size: u64, limit: u64 },

    #[error("not a raster image (declared {header:?}, detected {detected:?})")]
    DisallowedType {
        header: String,
        detected: Option<&'static str>,
    },

    #[error("upstream body failed: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    /// Stable label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network",
            Self::Status(_) => "status",
            Self::DeclaredTooLarge { .. } => "declared_too_large",
            Self::EmptyBody => "empty_body",
            Self::InitialChunkTooLarge { .. } => "initial_chunk_too_large",
            Self::DisallowedType { .. } => "disallowed_type",
            Self::Body(_) => "body",
        }
    }

    /// Failures worth sending to the error reporter. Validation rejections
    /// are routine and only logged.
    pub fn is_exceptional(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_) | Self::Body(_))
    }
}

/// Failure after response headers were committed. Surfaces to the client as
/// an errored body.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("image exceeded {limit} bytes after {forwarded} bytes were forwarded")]
    LimitExceeded { limit: u64, forwarded: u64 },

    #[error("upstream stalled for {0:?}")]
    Stalled(Duration),

    #[error("upstream body failed: {0}")]
    Upstream(String),
}

impl StreamError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::Stalled(_) => "stalled",
            Self::Upstream(_) => "upstream",
        }
    }
}
