//! Protocol fallback candidates.
//!
//! Secure delivery is always attempted first. Plain HTTP is only tried when the
//! upstream advertised it, and loopback hosts are fetched exactly as given.

use url::Url;

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Compute the ordered list of URLs to attempt for a normalized target.
pub fn build_candidates(normalized: &Url, original_was_http: bool) -> Vec<Url> {
    if is_loopback(normalized) {
        return vec![normalized.clone()];
    }

    let https = with_scheme(normalized, "https");
    let http = with_scheme(normalized, "http");

    match normalized.scheme() {
        "https" if !original_was_http => vec![https],
        _ => vec![https, http],
    }
}

fn is_loopback(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| LOOPBACK_HOSTS.iter().any(|l| host.eq_ignore_ascii_case(l)))
}

fn with_scheme(url: &Url, scheme: &str) -> Url {
    let mut variant = url.clone();
    // Switching between the two special web schemes cannot fail.
    let _ = variant.set_scheme(scheme);
    variant
}
