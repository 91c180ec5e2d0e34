//! Cache key derivation.

use axum::http::{header, HeaderMap, Method, Uri};

/// Key for a passthrough response: method, path and query, Accept-Encoding.
///
/// Only these three inputs participate, so requests that differ in any other
/// header share an entry. The method stays in the key, so HEAD requests never
/// match entries stored by GET.
pub fn cache_key(method: &Method, uri: &Uri, headers: &HeaderMap) -> String {
    let request_uri = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let accept_encoding = headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim();
    format!("{} {} ae={}", method, request_uri, accept_encoding)
}
