//! Reverse proxy for the giscus comments widget.
//!
//! The widget document is fetched fresh and rewritten; every other path is
//! passed through to the same upstream, with an in-memory cache for
//! responses that declare a positive `max-age`.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
