//! Cache-Control selection.

use url::Url;

use crate::config::CacheConfig;

/// Query parameter the origin application appends to content-addressed URLs.
const VERSION_PARAM: &str = "v";

/// Caching policy applied to a proxied response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Versioned upstream URL: cache for a year, never revalidate.
    Strong,
    /// Unversioned upstream URL: cache for a day, revalidate in background.
    Weak,
    /// Placeholder served on failure: short lived so transient upstream
    /// problems do not stick in edge caches.
    Fallback,
}

impl CachePolicy {
    /// Policy for a successfully fetched candidate URL.
    pub fn for_url(url: &Url) -> Self {
        if has_strong_cache_key(url) {
            Self::Strong
        } else {
            Self::Weak
        }
    }

    /// Render the `Cache-Control` header value.
    pub fn header_value(self, config: &CacheConfig) -> String {
        match self {
            Self::Strong => format!(
                "public, max-age={age}, s-maxage={age}, immutable",
                age = config.strong_max_age_secs
            ),
            Self::Weak => format!(
                "public, max-age={age}, s-maxage={age}, stale-while-revalidate={swr}",
                age = config.weak_max_age_secs,
                swr = config.weak_stale_while_revalidate_secs
            ),
            Self::Fallback => format!(
                "public, max-age={age}, s-maxage={age}, stale-while-revalidate={swr}",
                age = config.fallback_max_age_secs,
                swr = config.fallback_stale_while_revalidate_secs
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Weak => "weak",
            Self::Fallback => "fallback",
        }
    }
}

/// Whether the URL carries a non-blank `v` query parameter.
pub fn has_strong_cache_key(url: &Url) -> bool {
    url.query_pairs()
        .any(|(key, value)| key == VERSION_PARAM && !value.trim().is_empty())
}
