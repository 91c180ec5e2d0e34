//! Request handling core.
//!
//! # Data Flow
//! ```text
//! Router
//!     → widget.rs      (configured widget paths; always fresh, rewritten)
//!     → passthrough.rs (every other path; cached when upstream allows)
//!         → cache::ResponseStore (GET/HEAD lookup, 200 + max-age store)
//!     → upstream::UpstreamClient (one GET, 25s timeout, no retries)
//!     → rewrite.rs + encoding.rs (widget only)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Each handler enforces its own method set (GET/HEAD, OPTIONS → 204)
//! - Only allow-listed upstream headers reach the client
//! - HEAD never writes a body, whatever the cache state
//! - Every failure is terminal for the request and reported synchronously

pub mod encoding;
pub mod passthrough;
pub mod rewrite;
pub mod widget;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};
use thiserror::Error;

use crate::cache::{MemoryCache, ResponseStore};
use crate::config::ProxyConfig;
use crate::observability::AccessLog;
use crate::proxy::rewrite::RuleError;
use crate::upstream::{ReqwestUpstream, UpstreamClient, UpstreamError};

pub use passthrough::handle_passthrough;
pub use widget::handle_widget;

/// Outcome of a request that never reached a normal upstream response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    BadRule(#[from] RuleError),

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::BadRule(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Shared, immutable proxy state plus the two collaborators.
pub struct Proxy {
    origin: String,
    widget_source_path: String,
    user_agent: HeaderValue,
    forward_headers: Vec<HeaderName>,
    max_body_bytes: usize,
    max_decoded_bytes: usize,
    client: Arc<dyn UpstreamClient>,
    cache: Option<Arc<dyn ResponseStore>>,
}

impl Proxy {
    /// Assemble a proxy around the given client and optional cache.
    pub fn new(
        config: &ProxyConfig,
        client: Arc<dyn UpstreamClient>,
        cache: Option<Arc<dyn ResponseStore>>,
    ) -> Self {
        let user_agent = HeaderValue::from_str(&config.upstream.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("giscus-proxy/clean-1.0"));
        let forward_headers = config
            .cache
            .headers
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .collect();

        Self {
            origin: config.upstream.origin.trim_end_matches('/').to_string(),
            widget_source_path: config.upstream.widget_path.clone(),
            user_agent,
            forward_headers,
            max_body_bytes: config.cache.max_body_bytes,
            max_decoded_bytes: config.widget.max_decoded_bytes,
            client,
            cache,
        }
    }

    /// Build the production proxy: reqwest client and in-memory cache.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        let client = ReqwestUpstream::new(Duration::from_secs(config.upstream.timeout_secs))?;
        let cache: Option<Arc<dyn ResponseStore>> = if config.cache.enabled {
            Some(Arc::new(MemoryCache::new(config.cache.max_entries)))
        } else {
            None
        };
        Ok(Self::new(config, Arc::new(client), cache))
    }

    /// Upstream URL for a passthrough request: same path, raw query verbatim.
    pub fn passthrough_url(&self, uri: &Uri) -> String {
        match uri.query() {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.origin, uri.path(), q),
            _ => format!("{}{}", self.origin, uri.path()),
        }
    }

    /// Upstream URL of the widget document with the given encoded query.
    pub fn widget_url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("{}{}", self.origin, self.widget_source_path)
        } else {
            format!("{}{}?{}", self.origin, self.widget_source_path, query)
        }
    }

    /// Whether a declared Content-Length is too large to buffer.
    fn exceeds_body_limit(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok())
            .is_some_and(|len| len > self.max_body_bytes)
    }
}

/// A body read up to a size limit.
enum Buffered {
    Complete(Bytes),
    /// Over the limit: what was read, followed by the unread remainder.
    Overflow(Body),
}

/// Buffer `body` while it stays within `limit` bytes.
///
/// Nothing is lost on overflow; the returned body replays the buffered
/// prefix before streaming the rest.
async fn buffer_up_to(body: Body, limit: usize) -> Result<Buffered, axum::Error> {
    let mut chunks = body.into_data_stream();
    let mut buffered = BytesMut::new();
    while let Some(chunk) = chunks.next().await {
        buffered.extend_from_slice(&chunk?);
        if buffered.len() > limit {
            let head = stream::iter([Ok::<_, axum::Error>(buffered.freeze())]);
            return Ok(Buffered::Overflow(Body::from_stream(head.chain(chunks))));
        }
    }
    Ok(Buffered::Complete(buffered.freeze()))
}

/// Build a buffered response and emit its access event.
fn respond(
    log: AccessLog,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    send_body: bool,
) -> Response {
    let written = if send_body { body.len() as u64 } else { 0 };
    log.finish(status, written);

    let mut response = Response::new(if send_body { Body::from(body) } else { Body::empty() });
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// 204 answer to a CORS preflight.
fn preflight(log: AccessLog) -> Response {
    respond(log, StatusCode::NO_CONTENT, HeaderMap::new(), Bytes::new(), false)
}

/// Plain-text error response.
fn fail(log: AccessLog, err: ProxyError) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    let body = Bytes::from(format!("{}\n", err));
    respond(log, err.status(), headers, body, true)
}

/// Body sent when the upstream body could not be read.
fn read_failure(err: impl std::fmt::Display) -> Bytes {
    Bytes::from(format!("<!-- read body failed: {} -->", err))
}
