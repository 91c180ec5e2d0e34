//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Widget / passthrough handlers produce:
//!     → access.rs (one `request` event per request)
//!     → metrics.rs (counters, histograms, cache gauge)
//!
//! Consumers:
//!     → logging.rs (stdout, text or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than a formatted string
//! - Request ID flows through the access event
//! - Metrics are cheap (no-op without a recorder)

pub mod access;
pub mod logging;
pub mod metrics;

pub use access::{AccessLog, CacheState};
