//! Widget document handler.
//!
//! Always fetched fresh: the cache is never consulted. `rep` rules are parsed
//! and validated before upstream is contacted, then applied to the decoded
//! body followed by the fixed footer removal.

use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::Response;
use bytes::Bytes;
use url::form_urlencoded;

use crate::http::headers::copy_selected;
use crate::observability::{metrics, AccessLog};
use crate::proxy::encoding::ContentEncoding;
use crate::proxy::rewrite::{apply_rules, parse_rules, remove_footer, REP_PARAM};
use crate::proxy::{fail, preflight, read_failure, respond, Proxy, ProxyError};
use crate::upstream::UpstreamRequest;

const KIND: &str = "widget";
const WIDGET_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Serve the rewritten widget document.
pub async fn handle_widget(proxy: &Proxy, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let mut log = AccessLog::start(KIND, &parts.method, &parts.uri, &parts.headers);

    match parts.method {
        Method::OPTIONS => return preflight(log),
        Method::GET | Method::HEAD => {}
        _ => return fail(log, ProxyError::MethodNotAllowed),
    }

    let pairs: Vec<(String, String)> =
        form_urlencoded::parse(parts.uri.query().unwrap_or("").as_bytes())
            .into_owned()
            .collect();
    let rules = match parse_rules(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(rules) => rules,
        Err(e) => return fail(log, e.into()),
    };

    let forwarded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().filter(|(k, _)| k != REP_PARAM))
        .finish();
    let target = proxy.widget_url(&forwarded);
    log.set_target(target.as_str());

    let mut upstream_request = UpstreamRequest::get(target);
    upstream_request
        .headers
        .insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    upstream_request
        .headers
        .insert(header::ACCEPT, HeaderValue::from_static(WIDGET_ACCEPT));
    upstream_request
        .headers
        .insert(header::USER_AGENT, proxy.user_agent.clone());

    let upstream = match proxy.client.fetch(upstream_request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Widget upstream request failed");
            metrics::record_upstream_error(KIND);
            return fail(log, e.into());
        }
    };

    let status = upstream.status;
    let send_body = parts.method != Method::HEAD;
    let mut headers = HeaderMap::new();
    copy_selected(&mut headers, &upstream.headers, &[header::CONTENT_TYPE]);

    let encoding = ContentEncoding::from_headers(&upstream.headers);
    if let ContentEncoding::Other(name) = &encoding {
        // Not decodable here, so the bytes go out untouched.
        tracing::warn!(encoding = %name, "Unsupported widget encoding, forwarding unmodified");
        copy_selected(&mut headers, &upstream.headers, &[header::CONTENT_ENCODING]);
        let body = if send_body {
            log.finish_streaming(status, upstream.body)
        } else {
            log.finish(status, 0);
            axum::body::Body::empty()
        };
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        return response;
    }

    // The rewrite needs the whole document; the decoded size is bounded below.
    let raw = match axum::body::to_bytes(upstream.body, usize::MAX).await {
        Ok(raw) => raw,
        Err(e) => return respond(log, status, headers, read_failure(e), send_body),
    };
    let decoded = match encoding.decode(raw, proxy.max_decoded_bytes) {
        Ok(decoded) => decoded,
        Err(e) => return respond(log, status, headers, read_failure(e), send_body),
    };

    let body = remove_footer(apply_rules(decoded.to_vec(), &rules));
    respond(log, status, headers, Bytes::from(body), send_body)
}
