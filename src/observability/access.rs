//! Per-request access log.
//!
//! Every request handled by the proxy emits exactly one `request` event with
//! the handler kind, method, final status, bytes written, duration, cache
//! state, request path and upstream target. Streamed bodies report once the
//! body has been fully sent or dropped.

use std::fmt;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use futures_util::StreamExt;

use crate::http::request::request_id;
use crate::observability::metrics;

/// How the response cache took part in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// The handler never consults the cache.
    NotApplicable,
    Hit,
    /// Buffered from upstream, not stored.
    Miss,
    /// Buffered from upstream and stored.
    MissCached,
    /// Streamed straight through.
    Bypass,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::NotApplicable => "-",
            CacheState::Hit => "HIT",
            CacheState::Miss => "MISS",
            CacheState::MissCached => "MISS:cached",
            CacheState::Bypass => "BYPASS",
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a duration as `  12ms` below one second and `  1.25s` above.
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{:4}ms", d.as_millis())
    } else {
        format!("{:6.2}s", d.as_secs_f64())
    }
}

/// Fields collected while a request is being handled.
#[derive(Debug)]
pub struct AccessLog {
    kind: &'static str,
    method: Method,
    path: String,
    request_id: String,
    target: String,
    cache: CacheState,
    started: Instant,
}

impl AccessLog {
    /// Begin timing a request.
    pub fn start(kind: &'static str, method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            kind,
            method: method.clone(),
            path: uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.path().to_string()),
            request_id: request_id(headers).to_string(),
            target: String::new(),
            cache: CacheState::NotApplicable,
            started: Instant::now(),
        }
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }

    pub fn set_cache(&mut self, cache: CacheState) {
        self.cache = cache;
    }

    /// Emit the event for a response whose size is known.
    pub fn finish(self, status: StatusCode, bytes: u64) {
        let elapsed = self.started.elapsed();
        let target = if self.target.is_empty() { "-" } else { self.target.as_str() };

        tracing::info!(
            kind = self.kind,
            method = %self.method,
            status = status.as_u16(),
            bytes,
            dur = %format_duration(elapsed),
            cache = self.cache.as_str(),
            path = %self.path,
            upstream = %target,
            request_id = %self.request_id,
            "request"
        );
        metrics::record_request(self.kind, status.as_u16(), self.cache.as_str(), elapsed);
    }

    /// Wrap a streamed body so the event fires once it is sent or dropped.
    pub fn finish_streaming(self, status: StatusCode, body: Body) -> Body {
        let mut pending = PendingLog {
            log: Some(self),
            status,
            bytes: 0,
        };
        Body::from_stream(body.into_data_stream().map(move |chunk| {
            // Borrow the whole guard so the closure owns it, not just `bytes`.
            let pending = &mut pending;
            if let Ok(data) = &chunk {
                pending.bytes += data.len() as u64;
            }
            chunk
        }))
    }
}

struct PendingLog {
    log: Option<AccessLog>,
    status: StatusCode,
    bytes: u64,
}

impl Drop for PendingLog {
    fn drop(&mut self) {
        if let Some(log) = self.log.take() {
            log.finish(self.status, self.bytes);
        }
    }
}
