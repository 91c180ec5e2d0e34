//! Passthrough handler for every non-widget path.
//!
//! # Responsibilities
//! - Serve GET/HEAD from the response cache while an entry is live
//! - Forward misses upstream with the caller's path and raw query
//! - Buffer and store 200 uncompressed GET responses that carry `max-age`
//! - Stream everything else straight through, including bodies that outgrow
//!   the cacheable size while being read
//!
//! Compressed bodies are never decoded here.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use tokio::time::Instant;

use crate::cache::{cache_key, max_age, CacheEntry};
use crate::http::headers::copy_selected;
use crate::observability::{metrics, AccessLog, CacheState};
use crate::proxy::encoding::ContentEncoding;
use crate::proxy::{
    buffer_up_to, fail, preflight, read_failure, respond, Buffered, Proxy, ProxyError,
};
use crate::upstream::UpstreamRequest;

const KIND: &str = "pass";

/// Proxy a request to the same path on the upstream origin.
pub async fn handle_passthrough(proxy: &Proxy, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let mut log = AccessLog::start(KIND, &parts.method, &parts.uri, &parts.headers);
    log.set_cache(CacheState::Bypass);

    match parts.method {
        Method::OPTIONS => return preflight(log),
        Method::GET | Method::HEAD => {}
        _ => return fail(log, ProxyError::MethodNotAllowed),
    }

    let target = proxy.passthrough_url(&parts.uri);
    log.set_target(target.as_str());
    let send_body = parts.method == Method::GET;

    let key = cache_key(&parts.method, &parts.uri, &parts.headers);
    if let Some(entry) = proxy.cache.as_ref().and_then(|cache| cache.get(&key)) {
        log.set_cache(CacheState::Hit);
        let mut headers = HeaderMap::new();
        copy_selected(&mut headers, &entry.headers, &proxy.forward_headers);
        return respond(log, entry.status, headers, entry.body, send_body);
    }

    let mut upstream_request = UpstreamRequest::get(target);
    if let Some(ae) = parts.headers.get(header::ACCEPT_ENCODING) {
        if !ae.as_bytes().iter().all(u8::is_ascii_whitespace) {
            upstream_request.headers.insert(header::ACCEPT_ENCODING, ae.clone());
        }
    }
    upstream_request
        .headers
        .insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    upstream_request
        .headers
        .insert(header::USER_AGENT, proxy.user_agent.clone());

    let upstream = match proxy.client.fetch(upstream_request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Passthrough upstream request failed");
            metrics::record_upstream_error(KIND);
            return fail(log, e.into());
        }
    };

    let status = upstream.status;
    let mut headers = HeaderMap::new();
    copy_selected(&mut headers, &upstream.headers, &proxy.forward_headers);

    let cacheable = proxy.cache.is_some()
        && parts.method == Method::GET
        && status == StatusCode::OK
        && ContentEncoding::from_headers(&upstream.headers).is_identity()
        && !proxy.exceeds_body_limit(&upstream.headers);

    if !cacheable {
        let body = if send_body {
            log.finish_streaming(status, upstream.body)
        } else {
            log.finish(status, 0);
            Body::empty()
        };
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        return response;
    }

    let body = match buffer_up_to(upstream.body, proxy.max_body_bytes).await {
        Ok(Buffered::Complete(body)) => body,
        Ok(Buffered::Overflow(body)) => {
            let body = log.finish_streaming(status, body);
            let mut response = Response::new(body);
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            return response;
        }
        Err(e) => {
            log.set_cache(CacheState::Miss);
            return respond(log, status, headers, read_failure(e), send_body);
        }
    };

    match (max_age(&upstream.headers), proxy.cache.as_ref()) {
        (Some(ttl), Some(cache)) => {
            cache.set(
                key,
                CacheEntry {
                    status,
                    headers: headers.clone(),
                    body: body.clone(),
                    expires: Instant::now() + ttl,
                },
            );
            log.set_cache(CacheState::MissCached);
        }
        _ => log.set_cache(CacheState::Miss),
    }

    respond(log, status, headers, body, send_body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::proxy::testing::*;
    use bytes::Bytes;
    use std::time::Duration;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn script() -> Canned {
        Canned::ok("console.log(1)")
            .header("content-type", "application/javascript")
            .header("cache-control", "public, max-age=60")
            .header("set-cookie", "track=1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_until_max_age() {
        let upstream = MockUpstream::new(script());
        let proxy = proxy_with(upstream.clone(), Some(16));

        let first = handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(body_string(first).await, "console.log(1)");

        tokio::time::advance(Duration::from_secs(30)).await;
        let second = handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        assert_eq!(second.headers()[header::CONTENT_TYPE], "application/javascript");
        assert!(second.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_string(second).await, "console.log(1)");
        assert_eq!(upstream.calls(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_forwards_path_query_and_headers() {
        let upstream = MockUpstream::new(script());
        let proxy = proxy_with(upstream.clone(), Some(16));

        let request = Request::builder()
            .uri("/api/discussions?repo=a%2Fb&number=1")
            .header(header::ACCEPT_ENCODING, "gzip, br")
            .header(header::COOKIE, "secret=1")
            .body(Body::empty())
            .unwrap();
        handle_passthrough(&proxy, request).await;

        let sent = upstream.last_request().unwrap();
        assert_eq!(sent.url, "https://giscus.app/api/discussions?repo=a%2Fb&number=1");
        assert_eq!(sent.headers[header::ACCEPT_ENCODING], "gzip, br");
        assert_eq!(sent.headers[header::ACCEPT], "*/*");
        assert!(sent.headers.get(header::COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_accept_encoding_varies_the_key() {
        let upstream = MockUpstream::new(script());
        let proxy = proxy_with(upstream.clone(), Some(16));

        let gzip = Request::builder()
            .uri("/client.js")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();
        handle_passthrough(&proxy, gzip).await;
        handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_head_is_never_stored() {
        let upstream = MockUpstream::new(script());
        let proxy = proxy_with(upstream.clone(), Some(16));

        let response = handle_passthrough(&proxy, request(Method::HEAD, "/client.js")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
        handle_passthrough(&proxy, request(Method::HEAD, "/client.js")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_200_is_not_stored() {
        let upstream = MockUpstream::new(script().status(StatusCode::NOT_FOUND));
        let proxy = proxy_with(upstream.clone(), Some(16));

        let response = handle_passthrough(&proxy, request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        handle_passthrough(&proxy, request(Method::GET, "/missing")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_compressed_is_streamed_untouched() {
        let upstream = MockUpstream::new(
            Canned::ok(Bytes::from_static(b"\x1f\x8b opaque"))
                .header("content-encoding", "gzip")
                .header("cache-control", "max-age=600"),
        );
        let proxy = proxy_with(upstream.clone(), Some(16));

        let response = handle_passthrough(&proxy, request(Method::GET, "/bundle.js")).await;
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"\x1f\x8b opaque"));
        handle_passthrough(&proxy, request(Method::GET, "/bundle.js")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_without_max_age_is_not_stored() {
        let upstream = MockUpstream::new(Canned::ok("{}").header("cache-control", "no-cache"));
        let proxy = proxy_with(upstream.clone(), Some(16));

        handle_passthrough(&proxy, request(Method::GET, "/api/x")).await;
        handle_passthrough(&proxy, request(Method::GET, "/api/x")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_head_does_not_share_the_get_entry() {
        let upstream = MockUpstream::new(script());
        let proxy = proxy_with(upstream.clone(), Some(16));

        handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        let response = handle_passthrough(&proxy, request(Method::HEAD, "/client.js")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_disabled_streams_everything() {
        let upstream = MockUpstream::new(script());
        let proxy = proxy_with(upstream.clone(), None);

        let response = handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        assert_eq!(body_string(response).await, "console.log(1)");
        handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_preflight_and_rejected_methods() {
        let upstream = MockUpstream::new(script());
        let proxy = proxy_with(upstream.clone(), Some(16));

        let options = handle_passthrough(&proxy, request(Method::OPTIONS, "/api/x")).await;
        assert_eq!(options.status(), StatusCode::NO_CONTENT);

        let post = handle_passthrough(&proxy, request(Method::POST, "/api/x")).await;
        assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_string(post).await, "method not allowed\n");
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_502() {
        let proxy = proxy_with(MockUpstream::failing("connection refused"), Some(16));

        let response = handle_passthrough(&proxy, request(Method::GET, "/client.js")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = body_string(response).await;
        assert!(body.starts_with("upstream error: "));
        assert!(body.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_streamed() {
        let upstream = MockUpstream::new(script().header("content-length", "999999999"));
        let proxy = proxy_with(upstream.clone(), Some(16));

        handle_passthrough(&proxy, request(Method::GET, "/huge.bin")).await;
        handle_passthrough(&proxy, request(Method::GET, "/huge.bin")).await;
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_unsized_body_over_limit_is_streamed_whole() {
        let body = "x".repeat(4096) + "tail";
        let upstream = MockUpstream::new(
            Canned::ok(body.clone())
                .header("content-type", "application/javascript")
                .header("cache-control", "max-age=60"),
        );
        let mut config = ProxyConfig::default();
        config.cache.max_body_bytes = 1024;
        let proxy = proxy_with_config(upstream.clone(), Some(16), config);

        for _ in 0..2 {
            let response = handle_passthrough(&proxy, request(Method::GET, "/big.js")).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "application/javascript");
            assert_eq!(body_string(response).await, body);
        }
        assert_eq!(upstream.calls(), 2);
    }
}
