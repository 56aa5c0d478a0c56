//! Bounded key/value cache with expiry.
//!
//! Entries are kept in insertion order in an [`IndexMap`]. When the cache is
//! full, the oldest-inserted entry is evicted first; reads never change the
//! order. An entry is visible only while `now - inserted_at < ttl`, and an
//! expired lookup removes it.
//!
//! Timestamps are wall-clock epoch milliseconds so that a snapshot written to
//! disk keeps its age across restarts.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A cached value with its owning key and insertion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// Owning key.
    pub key: String,

    /// Cached value.
    pub value: T,

    /// Insertion time in epoch milliseconds.
    pub inserted_at: i64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(self.inserted_at) >= ttl_ms
    }
}

/// Size snapshot of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entries.
    pub size: usize,

    /// Maximum entries.
    pub capacity: usize,
}

/// Generic TTL cache with insertion-order eviction.
pub struct TtlCache<T> {
    entries: Mutex<IndexMap<String, CacheEntry<T>>>,
    ttl: Duration,
    capacity: usize,
}

impl<T: Clone> TtlCache<T> {
    /// Create an empty cache. A zero capacity or zero TTL disables caching.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self { entries: Mutex::new(IndexMap::with_capacity(capacity)), ttl, capacity }
    }

    /// Get a live value; an expired entry is evicted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = now_millis();
        let mut entries = self.lock();

        let expired = entries.get(key)?.is_expired(now, self.ttl);
        if expired {
            entries.shift_remove(key);
            tracing::debug!(key, "Cache entry expired");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert a value, evicting the oldest-inserted entry when full.
    ///
    /// Re-inserting an existing key refreshes its timestamp and makes it the
    /// newest entry.
    pub fn set(&self, key: impl Into<String>, value: T) {
        self.insert_entry(CacheEntry { key: key.into(), value, inserted_at: now_millis() });
    }

    /// Check for a live entry without cloning it.
    pub fn has(&self, key: &str) -> bool {
        let now = now_millis();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now, self.ttl) => {
                entries.shift_remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Current live size and capacity.
    pub fn stats(&self) -> CacheStats {
        let now = now_millis();
        let mut entries = self.lock();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        CacheStats { size: entries.len(), capacity: self.capacity }
    }

    /// Copy out all live entries, oldest first.
    pub fn snapshot(&self) -> Vec<CacheEntry<T>> {
        let now = now_millis();
        self.lock().values().filter(|entry| !entry.is_expired(now, self.ttl)).cloned().collect()
    }

    /// Load previously snapshotted entries, keeping their original timestamps.
    ///
    /// Expired entries are skipped; entries are replayed oldest first so the
    /// capacity bound keeps the newest ones.
    pub fn restore(&self, mut entries: Vec<CacheEntry<T>>) {
        let now = now_millis();
        entries.sort_by_key(|entry| entry.inserted_at);
        for entry in entries {
            if !entry.is_expired(now, self.ttl) {
                self.insert_entry(entry);
            }
        }
    }

    fn insert_entry(&self, entry: CacheEntry<T>) {
        if self.capacity == 0 || self.ttl.is_zero() {
            return;
        }

        let mut entries = self.lock();
        entries.shift_remove(&entry.key);

        while entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                tracing::debug!(key = %evicted, "Cache full, evicted oldest entry");
            }
        }

        entries.insert(entry.key.clone(), entry);
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for TtlCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
