//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the widget proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream service the widget is fetched from.
    pub upstream: UpstreamConfig,

    /// Widget document aliases served from this origin.
    pub widget: WidgetConfig,

    /// Passthrough response cache.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
///
/// `bind_address`, when set, overrides the separate `host` and `port`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Explicit bind address (e.g., "0.0.0.0:8080").
    pub bind_address: Option<String>,

    /// Host part used when no explicit address is given.
    pub host: String,

    /// Port used when no explicit address is given.
    pub port: u16,
}

impl ListenerConfig {
    /// The single address the server binds to.
    pub fn resolved_address(&self) -> String {
        if let Some(addr) = self.bind_address.as_deref().map(str::trim) {
            if !addr.is_empty() {
                return addr.to_string();
            }
        }
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: None,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and authority of the upstream service.
    pub origin: String,

    /// Upstream path of the widget document.
    pub widget_path: String,

    /// User-Agent sent on every upstream request.
    pub user_agent: String,

    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "https://giscus.app".to_string(),
            widget_path: "/en/widget".to_string(),
            user_agent: "giscus-proxy/clean-1.0".to_string(),
            timeout_secs: 25,
        }
    }
}

/// Local paths answered by the widget handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Exact paths (case-sensitive) routed to the widget handler.
    pub paths: Vec<String>,

    /// Upper bound on a gzip-decoded widget document.
    pub max_decoded_bytes: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            paths: vec!["/widget".to_string(), "/en/widget".to_string()],
            max_decoded_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Passthrough cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the in-memory response cache.
    pub enabled: bool,

    /// Maximum number of cached responses.
    pub max_entries: usize,

    /// Largest body the cache will hold; bigger responses stream through uncached.
    pub max_body_bytes: usize,

    /// Response headers kept in cache entries and forwarded on passthrough.
    pub headers: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 512,
            max_body_bytes: 8 * 1024 * 1024, // 8MB
            headers: [
                "Content-Type",
                "Content-Encoding",
                "Cache-Control",
                "ETag",
                "Last-Modified",
                "Vary",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (time until response head) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format: "text" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
