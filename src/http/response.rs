//! Response construction.
//!
//! # Responsibilities
//! - Turn a proxy outcome into an HTTP response
//! - Attach Content-Type and Cache-Control for images and the placeholder
//! - Map caller misuse to 400, upstream unavailability to a 200 placeholder

use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

use crate::config::CacheConfig;
use crate::proxy::placeholder::{placeholder_png, PLACEHOLDER_CONTENT_TYPE};
use crate::proxy::{CachePolicy, FetchedImage, ProxyOutcome};

/// Render a proxy outcome.
pub fn render(outcome: ProxyOutcome, cache: &CacheConfig) -> Response {
    match outcome {
        ProxyOutcome::Image(image) => image_response(image, cache),
        ProxyOutcome::InvalidTarget => placeholder_response(StatusCode::BAD_REQUEST, cache),
        ProxyOutcome::Exhausted | ProxyOutcome::DeadlineExceeded => {
            placeholder_response(StatusCode::OK, cache)
        }
    }
}

/// The placeholder with the short-lived fallback cache policy.
pub fn placeholder_response(status: StatusCode, cache: &CacheConfig) -> Response {
    (
        status,
        [
            (
                CONTENT_TYPE,
                HeaderValue::from_static(PLACEHOLDER_CONTENT_TYPE),
            ),
            (
                CACHE_CONTROL,
                cache_control(CachePolicy::Fallback, cache),
            ),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        placeholder_png(),
    )
        .into_response()
}

fn image_response(image: FetchedImage, cache: &CacheConfig) -> Response {
    let Ok(content_type) = HeaderValue::from_str(&image.content_type) else {
        tracing::warn!(content_type = %image.content_type, "Unrepresentable content type");
        return placeholder_response(StatusCode::OK, cache);
    };
    let policy = CachePolicy::for_url(&image.url);
    tracing::debug!(
        source = %image.url,
        content_type = %image.content_type,
        cache_policy = policy.as_str(),
        "Streaming image"
    );

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, cache_control(policy, cache)),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        image.body,
    )
        .into_response()
}

fn cache_control(policy: CachePolicy, cache: &CacheConfig) -> HeaderValue {
    HeaderValue::from_str(&policy.header_value(cache))
        .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
}
