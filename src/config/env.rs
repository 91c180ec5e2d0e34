//! Environment variable overlay.
//!
//! Deployment platforms pass the bind address through `ADDR` or `HOST`/`PORT`
//! and the externally visible URL through `PUBLIC_URL` or the Railway
//! variables. Values are trimmed; an empty value counts as unset.

use std::collections::HashMap;

use crate::config::loader::ConfigError;
use crate::config::schema::ProxyConfig;

/// Source of environment variables.
pub trait Env {
    /// Raw value of `key`, if set.
    fn var(&self, key: &str) -> Option<String>;

    /// Trimmed value of `key`, `None` when unset or blank.
    fn get(&self, key: &str) -> Option<String> {
        self.var(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Env for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Overlay environment settings onto `config`.
pub fn apply_env(config: &mut ProxyConfig, env: &impl Env) -> Result<(), ConfigError> {
    if let Some(addr) = env.get("ADDR") {
        config.listener.bind_address = Some(addr);
    }
    if let Some(host) = env.get("HOST") {
        config.listener.host = host;
    }
    if let Some(port) = env.get("PORT") {
        let port = port.trim_start_matches(':');
        config.listener.port = port.parse().map_err(|_| ConfigError::Env {
            key: "PORT",
            value: port.to_string(),
        })?;
    }
    if let Some(origin) = env.get("UPSTREAM_ORIGIN") {
        config.upstream.origin = origin;
    }
    Ok(())
}

/// Normalise `value` into a URL, prefixing `default_scheme` when no scheme is given.
pub fn ensure_url(value: &str, default_scheme: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    let scheme = if default_scheme.is_empty() { "https" } else { default_scheme };
    Some(format!("{}://{}", scheme, value))
}

/// Public URL of this service, for the startup banner.
///
/// Explicit platform hints win; otherwise the URL is composed from the bind
/// address with wildcard hosts shown as `localhost`.
pub fn derive_public_url(bind_address: &str, env: &impl Env) -> String {
    let hints = [
        ("PUBLIC_URL", ""),
        ("RAILWAY_PUBLIC_DOMAIN", "https"),
        ("RAILWAY_URL", ""),
    ];
    for (key, scheme) in hints {
        if let Some(url) = env.get(key).and_then(|v| ensure_url(&v, scheme)) {
            return url;
        }
    }

    let bind = bind_address.trim();
    let (host, port) = match bind.rfind(':') {
        Some(i) => (&bind[..i], &bind[i + 1..]),
        None => (bind, ""),
    };
    let host = match host {
        "" | "0.0.0.0" | "::" | "[::]" => "localhost",
        h => h,
    };
    let port = if port.is_empty() { "8080" } else { port };
    format!("http://{}:{}", host, port)
}
