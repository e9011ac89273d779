//! Upstream fetching with per-candidate validation.
//!
//! # Per-candidate protocol
//! ```text
//! GET candidate (attempt timeout covers connect, headers, initial bytes)
//!     → non-2xx                      → next candidate
//!     → Content-Length > limit       → next candidate (body never read)
//!     → read initial bytes (≤ 64 B window)
//!         → empty body               → next candidate
//!         → initial bytes > limit    → next candidate
//!     → resolve type (header, then sniff)
//!         → not a raster image       → next candidate
//!     → stream this candidate, stop iterating
//! ```
//!
//! Candidates are attempted strictly in order, one at a time. Dropping a
//! rejected response closes its connection.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{HeaderMap, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use url::Url;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::observability::reporter::{ErrorReporter, ReportContext};
use crate::proxy::error::FetchError;
use crate::proxy::sniff::{SniffedImage, SNIFF_WINDOW};
use crate::proxy::stream::{stream_body, StreamSettings};

type UpstreamBody = BoxStream<'static, reqwest::Result<Bytes>>;

/// An image ready to be served.
pub struct FetchedImage {
    /// The candidate that produced the image.
    pub url: Url,
    /// Resolved raster content type.
    pub content_type: String,
    /// Size-capped streaming body.
    pub body: Body,
}

impl std::fmt::Debug for FetchedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedImage")
            .field("url", &self.url.as_str())
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Validated response whose body has not been streamed yet.
struct OpenedImage {
    content_type: String,
    initial: Bytes,
    rest: UpstreamBody,
}

/// Fetches the first usable image among a list of candidates.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    config: UpstreamConfig,
    reporter: Arc<dyn ErrorReporter>,
}

impl ImageFetcher {
    /// Build a fetcher with its own connection pool.
    pub fn new(config: UpstreamConfig, reporter: Arc<dyn ErrorReporter>) -> reqwest::Result<Self> {
        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .redirect(redirect)
            .user_agent(config.user_agent.clone());
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self::with_client(client, config, reporter))
    }

    pub fn with_client(
        client: reqwest::Client,
        config: UpstreamConfig,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            client,
            config,
            reporter,
        }
    }

    /// Try each candidate in order and return the first usable image.
    ///
    /// Failures are absorbed: transport errors go to the reporter, validation
    /// rejections are logged, and `None` means every candidate failed.
    pub async fn fetch_first(&self, candidates: &[Url]) -> Option<FetchedImage> {
        for candidate in candidates {
            match self.try_candidate(candidate).await {
                Ok(image) => return Some(image),
                Err(err) => {
                    metrics::record_candidate_failure(err.reason());
                    if err.is_exceptional() {
                        self.reporter
                            .report(&err, &ReportContext::new("fetch", candidate));
                    }
                    tracing::debug!(
                        candidate = %candidate,
                        reason = err.reason(),
                        error = %err,
                        "Candidate rejected"
                    );
                }
            }
        }
        None
    }

    async fn try_candidate(&self, url: &Url) -> Result<FetchedImage, FetchError> {
        let timeout = self.config.attempt_timeout();
        let opened = tokio::time::timeout(timeout, self.open(url))
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        let settings = StreamSettings {
            limit: self.config.max_body_bytes,
            idle_timeout: self.config.read_idle_timeout(),
            channel_capacity: self.config.channel_capacity,
        };
        let body = stream_body(
            opened.initial,
            opened.rest,
            settings,
            url.clone(),
            self.reporter.clone(),
        );

        Ok(FetchedImage {
            url: url.clone(),
            content_type: opened.content_type,
            body,
        })
    }

    async fn open(&self, url: &Url) -> Result<OpenedImage, FetchError> {
        let limit = self.config.max_body_bytes;

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        if let Some(declared) = declared_length(response.headers()) {
            if declared > limit {
                return Err(FetchError::DeclaredTooLarge { declared, limit });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut rest = response.bytes_stream().boxed();
        let initial = read_initial(&mut rest).await?;
        if initial.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        if initial.len() as u64 > limit {
            return Err(FetchError::InitialChunkTooLarge {
                size: initial.len() as u64,
                limit,
            });
        }

        let sniffed = SniffedImage::resolve(content_type.as_deref(), &initial);
        let content_type = sniffed.final_type.ok_or(FetchError::DisallowedType {
            header: sniffed.header_type,
            detected: sniffed.detected_type,
        })?;

        Ok(OpenedImage {
            content_type,
            initial,
            rest,
        })
    }
}

/// Numeric `Content-Length`, if the upstream sent one.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Read the first bytes of the body. Small chunks are coalesced until the
/// sniff window is filled or the body ends.
async fn read_initial(body: &mut UpstreamBody) -> Result<Bytes, FetchError> {
    let first = match body.next().await {
        Some(chunk) => chunk.map_err(FetchError::Body)?,
        None => return Ok(Bytes::new()),
    };
    if first.len() >= SNIFF_WINDOW {
        return Ok(first);
    }

    let mut initial = BytesMut::from(&first[..]);
    while initial.len() < SNIFF_WINDOW {
        match body.next().await {
            Some(chunk) => initial.extend_from_slice(&chunk.map_err(FetchError::Body)?),
            None => break,
        }
    }
    Ok(initial.freeze())
}
