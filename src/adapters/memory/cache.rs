//! Moka-backed TTL cache adapter.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};

use crate::domain::ports::CacheBackend;

#[derive(Clone)]
struct StoredEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// In-process cache backend with per-entry TTL.
///
/// Moka handles capacity-based eviction; per-entry expiry is checked on
/// read because each `put` carries its own TTL.
pub struct MokaCache {
    entries: Cache<String, StoredEntry>,
}

impl MokaCache {
    /// Create a cache bounded to `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Number of live entries, for diagnostics.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[async_trait]
impl CacheBackend for MokaCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entry = self.entries.get(key).await?;
        if entry.expires_at <= Instant::now() {
            self.entries.invalidate(key).await;
            return None;
        }
        Some(entry.value)
    }

    async fn put(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        self.entries
            .insert(
                key.to_string(),
                StoredEntry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            )
            .await;
    }

    async fn forget(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}
