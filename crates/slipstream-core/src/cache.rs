//! Bounded TTL response cache with FIFO eviction.
//!
//! Entries expire after a fixed TTL and are evicted lazily when a read
//! finds them stale. When the store is full, `set` evicts the single
//! oldest entry by insertion order before inserting. Eviction is FIFO by
//! `inserted_at`, not recency-based: a read does not refresh an entry's
//! position.
//!
//! The map and the insertion-order deque live behind one mutex so that
//! size checks, evictions, and inserts are a single uninterrupted step.
//! Timestamps use [`tokio::time::Instant`] so paused-clock tests can drive
//! expiry deterministically.

use crate::{key::RequestKey, Payload};
use ahash::RandomState;
use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::HashMap, collections::VecDeque, time::Duration};
use tokio::time::Instant;
use tracing::trace;

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,
    /// Maximum number of entries.
    pub max_size: usize,
    /// Entry time-to-live in milliseconds.
    pub ttl_ms: u64,
}

struct CacheEntry {
    payload: Payload,
    inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<RequestKey, CacheEntry, RandomState>,
    /// Keys in insertion order; front is the oldest entry.
    order: VecDeque<RequestKey>,
}

/// Bounded key-value store for parsed response payloads.
///
/// All methods are thread-safe; none suspends. Size never exceeds
/// `max_size` at any observable point.
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    max_size: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Creates a cache holding at most `max_size` entries, each valid for
    /// `ttl` after insertion.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is 0: a zero-capacity cache cannot honor its
    /// size bound. The configuration layer rejects this before it gets
    /// here; the assert protects direct constructions.
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        assert!(max_size > 0, "cache capacity must be greater than 0");
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_hasher(RandomState::new()),
                order: VecDeque::new(),
            }),
            max_size,
            ttl,
        }
    }

    /// Looks up a payload. A stale entry is removed and reported as a miss.
    #[must_use]
    pub fn get(&self, key: &RequestKey) -> Option<Payload> {
        let mut inner = self.inner.lock();

        let fresh = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() < self.ttl,
            None => return None,
        };

        if fresh {
            return inner.entries.get(key).map(|entry| entry.payload.clone());
        }

        trace!(key = %key, "evicting stale cache entry");
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
        None
    }

    /// Inserts a payload, evicting the oldest entry first when full.
    ///
    /// Re-setting an existing key refreshes both its payload and its
    /// insertion position.
    pub fn set(&self, key: RequestKey, payload: Payload) {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else if inner.entries.len() >= self.max_size {
            if let Some(oldest) = inner.order.pop_front() {
                trace!(key = %oldest, "evicting oldest cache entry");
                inner.entries.remove(&oldest);
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, CacheEntry { payload, inserted_at: Instant::now() });
    }

    /// Removes all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Returns current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            ttl_ms: u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
