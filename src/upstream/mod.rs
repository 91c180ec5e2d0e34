//! Upstream client subsystem.
//!
//! The only suspension point of a proxied request is the call made through
//! [`UpstreamClient`]. Production uses [`ReqwestUpstream`]; tests plug in
//! their own implementation.

pub mod client;

pub use client::{ReqwestUpstream, UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse};
