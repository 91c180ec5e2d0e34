//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, route widget aliases vs. fallback)
//!     → request.rs (assign or keep x-request-id)
//!     → proxy::{widget, passthrough} (handlers)
//!     → headers.rs (allow-listed upstream headers only)
//!     → cors.rs (permissive CORS on every response)
//!     → Send to client
//! ```

pub mod cors;
pub mod headers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
