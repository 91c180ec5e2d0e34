//! Permissive CORS headers.
//!
//! Applied as the outermost response mapping so every response carries them:
//! widget and passthrough responses, cache hits, OPTIONS and errors alike.

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;

pub const ALLOW_METHODS: &str = "GET,HEAD,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type,Authorization,Accept";

/// Write the CORS headers into `headers`.
///
/// `Vary` keeps whatever upstream sent and gains `Origin` when missing.
pub fn write_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );

    let vary = headers
        .get(header::VARY)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let vary = match vary {
        Some(v) if v == "*" || v.split(',').any(|t| t.trim().eq_ignore_ascii_case("origin")) => {
            return;
        }
        Some(v) => HeaderValue::from_str(&format!("{}, Origin", v))
            .unwrap_or_else(|_| HeaderValue::from_static("Origin")),
        None => HeaderValue::from_static("Origin"),
    };
    headers.insert(header::VARY, vary);
}

/// Response mapping used by the router.
pub async fn add_cors_headers(mut response: Response) -> Response {
    write_cors(response.headers_mut());
    response
}
