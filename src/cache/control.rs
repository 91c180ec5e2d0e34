//! Cache-Control parsing.
//!
//! Only `max-age` decides whether a passthrough response is stored. A
//! response is cacheable when some `max-age=N` directive has `N > 0`; the
//! first such directive wins.

use std::time::Duration;

use axum::http::{header, HeaderMap};

/// Positive `max-age` of a Cache-Control header value.
pub fn parse_max_age(value: &str) -> Option<Duration> {
    value.split(',').find_map(|directive| {
        let directive = directive.trim();
        let (name, secs) = directive.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        match secs.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => None,
        }
    })
}

/// TTL granted by the `Cache-Control` header of an upstream response.
pub fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_max_age)
}
