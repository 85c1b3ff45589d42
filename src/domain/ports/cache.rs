//! Port for the key-value cache backend.

use async_trait::async_trait;
use std::time::Duration;

/// Generic TTL key-value cache.
///
/// Entries are always fully replaced, never merged, so no read-modify-write
/// coordination is required. Adapters absorb backend failures: a failed read
/// is a miss, a failed write is dropped.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry. `None` for missing or expired keys.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store an entry with a time-to-live.
    async fn put(&self, key: &str, value: serde_json::Value, ttl: Duration);

    /// Drop an entry if present.
    async fn forget(&self, key: &str);
}
