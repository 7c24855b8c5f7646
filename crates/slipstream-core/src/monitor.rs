//! Aggregating performance monitor with observer fan-out.
//!
//! Dual-path recording in the same shape as the metrics layer of a proxy:
//! lock-free `metrics` facade counters/histograms on the hot path for
//! external collectors, plus an internal aggregate snapshot maintained
//! under a lock and served to observers and `get_metrics` callers.
//!
//! Observers run synchronously after every update. A panicking observer is
//! caught and logged; it never affects the recorder or later observers.

use metrics::{counter, histogram};
use parking_lot::RwLock;
use serde::Serialize;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::warn;

/// Aggregate request metrics. Averages are cumulative moving averages over
/// `total_requests`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Total recorded requests.
    pub total_requests: u64,
    /// Requests recorded as successful.
    pub successful_requests: u64,
    /// Requests recorded as failed.
    pub failed_requests: u64,
    /// Cumulative moving average of response time in milliseconds.
    pub average_response_time_ms: f64,
    /// Cumulative bytes transferred.
    pub total_data_transferred: u64,
    /// Cumulative moving average of the cache-hit indicator (0.0–1.0).
    pub cache_hit_rate: f64,
}

/// One observed request outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOutcome {
    /// Whether the request succeeded.
    pub success: bool,
    /// Wall-clock duration of the request, when measured.
    pub response_time: Option<Duration>,
    /// Response payload size in bytes, when known.
    pub data_size: Option<u64>,
    /// Whether the result was served from cache.
    pub from_cache: bool,
}

/// Handle identifying a registered observer, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn Fn(&MetricsSnapshot) + Send + Sync>;

/// Process-wide request metrics aggregator.
///
/// Constructed once and shared by reference; callers never mutate the
/// snapshot directly.
#[derive(Default)]
pub struct PerformanceMonitor {
    metrics: RwLock<MetricsSnapshot>,
    observers: RwLock<Vec<(ObserverId, Observer)>>,
    next_observer_id: AtomicU64,
}

impl PerformanceMonitor {
    /// Creates a monitor with zeroed metrics and no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request outcome and notifies every observer with the
    /// updated snapshot.
    ///
    /// Update order: total count, success/failure count, response-time
    /// average (when a duration was supplied), data volume, cache-hit
    /// average. The averages divide by the post-increment total.
    pub fn record_request(&self, outcome: RequestOutcome) {
        counter!("slipstream_requests_total").increment(1);
        if outcome.success {
            counter!("slipstream_requests_succeeded").increment(1);
        } else {
            counter!("slipstream_requests_failed").increment(1);
        }
        if outcome.from_cache {
            counter!("slipstream_cache_hits").increment(1);
        }

        let snapshot = {
            let mut metrics = self.metrics.write();
            metrics.total_requests += 1;
            if outcome.success {
                metrics.successful_requests += 1;
            } else {
                metrics.failed_requests += 1;
            }

            let n = metrics.total_requests as f64;

            if let Some(elapsed) = outcome.response_time {
                let sample = elapsed.as_secs_f64() * 1000.0;
                histogram!("slipstream_request_duration_ms").record(sample);
                metrics.average_response_time_ms =
                    (metrics.average_response_time_ms * (n - 1.0) + sample) / n;
            }

            if let Some(bytes) = outcome.data_size {
                metrics.total_data_transferred += bytes;
            }

            let hit = if outcome.from_cache { 1.0 } else { 0.0 };
            metrics.cache_hit_rate = (metrics.cache_hit_rate * (n - 1.0) + hit) / n;

            metrics.clone()
        };

        self.notify_observers(&snapshot);
    }

    /// Registers an observer invoked synchronously after every recorded
    /// request. Returns a handle for [`remove_observer`](Self::remove_observer).
    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&MetricsSnapshot) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Box::new(observer)));
        id
    }

    /// Removes a registered observer. Returns `true` if it was present.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Returns the current metrics snapshot.
    #[must_use]
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.read().clone()
    }

    /// Resets all aggregate metrics to zero. Observers stay registered.
    pub fn reset_metrics(&self) {
        *self.metrics.write() = MetricsSnapshot::default();
    }

    fn notify_observers(&self, snapshot: &MetricsSnapshot) {
        let observers = self.observers.read();
        for (id, observer) in observers.iter() {
            // Per-subscriber isolation: a panicking observer must not take
            // down the recorder or suppress later observers.
            if catch_unwind(AssertUnwindSafe(|| observer(snapshot))).is_err() {
                warn!(observer_id = id.0, "metrics observer panicked; continuing");
            }
        }
    }
}
