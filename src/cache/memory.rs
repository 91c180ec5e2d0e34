//! In-memory response cache.

use std::collections::HashMap;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::observability::metrics;

/// A cached upstream response.
///
/// Immutable once stored; `body` is a shared, read-only buffer.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: StatusCode,
    /// Allow-listed response headers only.
    pub headers: HeaderMap,
    pub body: Bytes,
    pub expires: Instant,
}

impl CacheEntry {
    /// Check whether the entry is past its expiry.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires
    }
}

/// Storage used by the passthrough handler.
pub trait ResponseStore: Send + Sync {
    /// Fetch a live entry; expired entries count as absent.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Store `entry` under `key`, replacing any previous entry.
    fn set(&self, key: String, entry: CacheEntry);
}

/// A bounded map guarded by a single reader/writer lock.
///
/// When a new key arrives at capacity one arbitrary entry is evicted. Expired
/// entries are only dropped lazily, by overwrite or eviction.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryCache {
    /// Create an empty cache holding at most `max_entries` responses.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(max_entries.min(1024))),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, expired ones included.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl ResponseStore for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read();
        entries.get(key).filter(|e| !e.is_expired()).cloned()
    }

    fn set(&self, key: String, entry: CacheEntry) {
        let mut entries = self.entries.write();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            if let Some(victim) = entries.keys().next().cloned() {
                entries.remove(&victim);
                tracing::trace!(key = %victim, "Evicted cache entry");
            }
        }
        entries.insert(key, entry);
        metrics::record_cache_size(entries.len());
    }
}
