//! Target URL normalization.
//!
//! Turns the raw `url` query value into an absolute `http`/`https` URL or
//! rejects it. Total over arbitrary input: nothing here panics.

use url::Url;

const SCHEME_SEPARATOR: &str = "://";

/// Normalize a raw target string into an absolute `http`/`https` URL.
///
/// - surrounding whitespace is trimmed
/// - protocol-relative input (`//host/path`) is treated as `https:`
/// - the input must carry an explicit `http` or `https` scheme; relative or
///   scheme-less strings are rejected
pub fn normalize_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.starts_with("//") {
        format!("https:{trimmed}")
    } else {
        trimmed.to_string()
    };

    let (scheme, _) = candidate.split_once(SCHEME_SEPARATOR)?;
    if !is_web_scheme(scheme) {
        return None;
    }

    let url = Url::parse(&candidate).ok()?;
    if !is_web_scheme(url.scheme()) {
        return None;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

/// Whether the pre-normalization input asked for plain `http`.
///
/// Protocol-relative input counts as `https`.
pub fn original_was_http(raw: &str) -> bool {
    raw.trim()
        .split_once(SCHEME_SEPARATOR)
        .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case("http"))
}

fn is_web_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}
