//! Selective header copying.

use axum::http::{HeaderMap, HeaderName};

/// Copy each of `names` from `src` into `dst`.
///
/// Headers missing from `src` or with an empty value are skipped; `dst` is
/// never cleared. Only the first value of a repeated header is copied.
pub fn copy_selected(dst: &mut HeaderMap, src: &HeaderMap, names: &[HeaderName]) {
    for name in names {
        if let Some(value) = src.get(name) {
            if !value.is_empty() {
                dst.insert(name.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn test_copies_only_named_headers() {
        let mut src = HeaderMap::new();
        src.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        src.insert(header::SET_COOKIE, HeaderValue::from_static("a=b"));
        src.insert(header::ETAG, HeaderValue::from_static(""));

        let mut dst = HeaderMap::new();
        dst.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        copy_selected(
            &mut dst,
            &src,
            &[header::CONTENT_TYPE, header::ETAG, header::CACHE_CONTROL],
        );

        assert_eq!(dst[header::CONTENT_TYPE], "text/html");
        assert!(dst.get(header::SET_COOKIE).is_none());
        assert!(dst.get(header::ETAG).is_none());
        // Absent from the source, so left alone.
        assert_eq!(dst[header::CACHE_CONTROL], "no-store");
    }
}
