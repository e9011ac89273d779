//! Request-level orchestration: target → candidates → first usable image.

use crate::proxy::candidates::build_candidates;
use crate::proxy::fetch::{FetchedImage, ImageFetcher};
use crate::proxy::normalize::{normalize_url, original_was_http};

/// Result of resolving a proxy request.
#[derive(Debug)]
pub enum ProxyOutcome {
    /// An upstream image is ready to stream.
    Image(FetchedImage),
    /// The `url` parameter was missing or not an absolute http(s) URL.
    InvalidTarget,
    /// Every candidate failed.
    Exhausted,
    /// The request deadline passed before a candidate succeeded.
    DeadlineExceeded,
}

impl ProxyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::InvalidTarget => "invalid_target",
            Self::Exhausted => "exhausted",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// The image proxy pipeline, independent of the HTTP framework.
#[derive(Clone)]
pub struct ImageProxy {
    fetcher: ImageFetcher,
}

impl ImageProxy {
    pub fn new(fetcher: ImageFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn resolve(&self, target: Option<&str>) -> ProxyOutcome {
        let Some(raw) = target else {
            return ProxyOutcome::InvalidTarget;
        };
        let Some(normalized) = normalize_url(raw) else {
            tracing::debug!(url = %raw, "Rejected image target");
            return ProxyOutcome::InvalidTarget;
        };

        let candidates = build_candidates(&normalized, original_was_http(raw));
        tracing::debug!(
            url = %normalized,
            candidates = candidates.len(),
            "Fetching image"
        );

        match self.fetcher.fetch_first(&candidates).await {
            Some(image) => ProxyOutcome::Image(image),
            None => {
                tracing::info!(url = %normalized, "All candidates failed, serving placeholder");
                ProxyOutcome::Exhausted
            }
        }
    }
}
