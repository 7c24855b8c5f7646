//! In-flight request deduplication.
//!
//! Concurrent callers requesting the same [`RequestKey`] coalesce onto a
//! single shared execution: exactly one operation runs, and every caller
//! observes the identical payload or the identical error. Settled results
//! are additionally kept in a short-TTL cache so a burst of repeats just
//! after settlement is still absorbed without touching the network.
//!
//! The critical invariant is that the pending entry is registered inside
//! the pending map's entry lock, before any await point. Two callers that
//! both miss the short-TTL cache can therefore never both install an
//! operation for the same key: the second one always finds the first one's
//! entry. Cleanup runs inside the shared future immediately before it
//! resolves, so the entry is removed the instant the operation settles,
//! success or failure alike. If every waiter is dropped before the
//! operation settles, the entry stays until the next caller for the key
//! coalesces onto it and drives it to completion.

use crate::{cache::ResponseCache, error::FetchError, key::RequestKey, Payload};
use ahash::RandomState;
use dashmap::{mapref::entry::Entry, DashMap};
use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::trace;

type SharedFetch = Shared<BoxFuture<'static, Result<Payload, FetchError>>>;

/// Coalesces concurrent identical requests and caches recent results.
pub struct DedupManager {
    pending: Arc<DashMap<RequestKey, SharedFetch, RandomState>>,
    recent: Arc<ResponseCache>,
}

impl DedupManager {
    /// Creates a manager whose settled-result cache holds up to
    /// `recent_capacity` entries for `recent_ttl` each.
    #[must_use]
    pub fn new(recent_ttl: Duration, recent_capacity: usize) -> Self {
        Self {
            pending: Arc::new(DashMap::with_hasher(RandomState::new())),
            recent: Arc::new(ResponseCache::new(recent_capacity, recent_ttl)),
        }
    }

    /// Returns the result for `key`, invoking `operation` only when no
    /// fresh cached result and no in-flight execution exists.
    ///
    /// # Errors
    ///
    /// Propagates the operation's error identically to every coalesced
    /// caller; errors are never swallowed here.
    pub async fn deduplicate<F, Fut>(
        &self,
        key: RequestKey,
        operation: F,
    ) -> Result<Payload, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Payload, FetchError>> + Send + 'static,
    {
        if let Some(payload) = self.recent.get(&key) {
            trace!(key = %key, "dedup cache hit");
            return Ok(payload);
        }

        let shared = match self.pending.entry(key.clone()) {
            Entry::Occupied(entry) => {
                trace!(key = %key, "coalescing onto in-flight request");
                entry.get().clone()
            }
            Entry::Vacant(slot) => {
                let pending = Arc::clone(&self.pending);
                let recent = Arc::clone(&self.recent);
                let operation = operation();
                let wrapped = async move {
                    let result = operation.await;
                    // Remove before resolving so a caller arriving after
                    // settlement starts a fresh execution instead of
                    // attaching to a settled future.
                    pending.remove(&key);
                    if let Ok(payload) = &result {
                        recent.set(key, payload.clone());
                    }
                    result
                }
                .boxed()
                .shared();
                slot.insert(wrapped.clone());
                wrapped
            }
        };

        shared.await
    }

    /// Returns a recently settled result for `key`, if one is still fresh.
    #[must_use]
    pub fn recent(&self, key: &RequestKey) -> Option<Payload> {
        self.recent.get(key)
    }

    /// Number of operations currently in flight.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
