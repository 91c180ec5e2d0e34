//! Passthrough response cache.
//!
//! # Data Flow
//! ```text
//! GET/HEAD passthrough request
//!     → key.rs (method + path?query + Accept-Encoding)
//!     → memory.rs (lookup; expired entries read as misses)
//!
//! 200, uncompressed GET response from upstream
//!     → control.rs (Cache-Control max-age > 0?)
//!     → memory.rs (store with expiry = now + max-age)
//! ```
//!
//! # Design Decisions
//! - Two-operation store trait so eviction policy stays out of the handlers
//! - One reader/writer lock, many concurrent readers
//! - Eviction on overflow is arbitrary, not LRU
//! - No persistence, no invalidation

pub mod control;
pub mod key;
pub mod memory;

pub use control::max_age;
pub use key::cache_key;
pub use memory::{CacheEntry, MemoryCache, ResponseStore};
