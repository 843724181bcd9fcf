//! Time-bounded cache for directory answers.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// A thread-safe map whose entries expire a fixed time after insertion.
///
/// Expiry is measured with the tokio clock, so tests can drive it with
/// `tokio::time::pause` and `advance`.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache with the given entry lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a fresh value. Expired entries are treated as missing.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Insert or replace a value, restarting its lifetime.
    pub fn insert(&self, key: K, value: V) {
        self.entries.write().insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}
