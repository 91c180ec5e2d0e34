//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, cache bound > 0)
//! - Check that paths, URLs and header names are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.upstream.origin) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {}
        _ => errors.push(ValidationError::new(
            "upstream.origin",
            format!("expected an absolute http(s) URL, got {:?}", config.upstream.origin),
        )),
    }
    if !config.upstream.widget_path.starts_with('/') {
        errors.push(ValidationError::new("upstream.widget_path", "must start with '/'"));
    }
    if HeaderValue::from_str(&config.upstream.user_agent).is_err() {
        errors.push(ValidationError::new(
            "upstream.user_agent",
            "must be a valid header value",
        ));
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    if config.widget.paths.is_empty() {
        errors.push(ValidationError::new("widget.paths", "at least one path is required"));
    }
    let mut seen = HashSet::new();
    for path in &config.widget.paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "widget.paths",
                format!("{:?} must start with '/'", path),
            ));
        } else if path.contains(['{', '}', '*']) {
            errors.push(ValidationError::new(
                "widget.paths",
                format!("{:?} must be a literal path", path),
            ));
        }
        if !seen.insert(path.as_str()) {
            errors.push(ValidationError::new(
                "widget.paths",
                format!("{:?} is listed twice", path),
            ));
        }
    }

    if config.widget.max_decoded_bytes == 0 {
        errors.push(ValidationError::new(
            "widget.max_decoded_bytes",
            "must be greater than 0",
        ));
    }

    if config.cache.enabled && config.cache.max_entries == 0 {
        errors.push(ValidationError::new("cache.max_entries", "must be greater than 0"));
    }
    for name in &config.cache.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "cache.headers",
                format!("{:?} is not a valid header name", name),
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if !matches!(config.observability.log_format.as_str(), "text" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "expected \"text\" or \"json\"",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
