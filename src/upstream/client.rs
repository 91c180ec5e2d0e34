//! Outbound HTTP to the upstream service.
//!
//! # Responsibilities
//! - Perform exactly one GET per call, bounded by a fixed timeout
//! - Return the response head with an unbuffered body
//! - Report transport failures distinctly from timeouts
//!
//! # Design Decisions
//! - No retries: a failed call surfaces immediately
//! - No automatic decompression, compressed bytes pass through untouched
//! - Injected as a trait object so tests can substitute a mock

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

/// Failure to obtain a response from upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("{0}")]
    Transport(String),

    #[error("failed to build upstream request: {0}")]
    InvalidRequest(String),
}

/// A GET request to upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: HeaderMap,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }
}

/// Upstream response head with a streaming body.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Performs one outbound request.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

/// `reqwest`-backed client shared by all requests.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestUpstream {
    /// Build a client whose every request fails after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::InvalidRequest(e.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn fetch(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| UpstreamError::InvalidRequest(format!("{}: {}", request.url, e)))?;

        let response = self
            .client
            .get(url)
            .headers(request.headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout {
                        url: request.url.clone(),
                        secs: self.timeout.as_secs(),
                    }
                } else {
                    UpstreamError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        Ok(UpstreamResponse {
            status,
            headers,
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}
