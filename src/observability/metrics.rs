//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by handler kind, status, cache state
//! - `proxy_request_duration_seconds` (histogram): latency by handler kind
//! - `proxy_upstream_errors_total` (counter): failed upstream calls by handler kind
//! - `proxy_cache_entries` (gauge): current cache size
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(kind: &'static str, status: u16, cache: &'static str, duration: Duration) {
    metrics::counter!(
        "proxy_requests_total",
        "kind" => kind,
        "status" => status.to_string(),
        "cache" => cache
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "kind" => kind)
        .record(duration.as_secs_f64());
}

/// Record an upstream call that failed before a response arrived.
pub fn record_upstream_error(kind: &'static str) {
    metrics::counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}

/// Record the number of cached responses.
pub fn record_cache_size(entries: usize) {
    metrics::gauge!("proxy_cache_entries").set(entries as f64);
}
