//! The facade callers use: single-request fetch and chunked batch fetch.
//!
//! Request flow for a single fetch:
//!
//! ```text
//! caller ──► cache lookup ──hit──► record (from_cache) ──► return
//!                │ miss
//!                ▼
//!        deduplication (optional)
//!                │ not in flight
//!                ▼
//!          request queue ──► transport ──► parse JSON
//!                                             │
//!                              cache fill ◄───┤ success
//!                              record (timed) │
//!                                             ▼
//!                                     payload to every
//!                                     coalesced caller
//! ```
//!
//! All managers are constructed once per client and passed by reference;
//! there is no global state.

use crate::{
    cache::{CacheStats, ResponseCache},
    config::SlipstreamConfig,
    dedup::DedupManager,
    error::FetchError,
    key::{RequestDescriptor, RequestKey, RequestOptions},
    monitor::{MetricsSnapshot, PerformanceMonitor, RequestOutcome},
    queue::{QueueConfig, RequestQueue},
    transport::{HttpTransport, Transport},
    Payload,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One request in a batch submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Target URL.
    pub url: String,
    /// Request options.
    #[serde(default)]
    pub options: RequestOptions,
}

impl BatchRequest {
    /// Builds a batch item.
    #[must_use]
    pub fn new(url: impl Into<String>, options: RequestOptions) -> Self {
        Self { url: url.into(), options }
    }
}

/// Positionally indexed batch outcome: for each input index exactly one of
/// `results[i]` and `errors[i]` is populated.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successful payloads at their original indices.
    pub results: Vec<Option<Payload>>,
    /// Failures at their original indices.
    pub errors: Vec<Option<FetchError>>,
}

impl BatchOutcome {
    /// Number of items that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of items that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.errors.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Network request optimization client.
///
/// Owns the four managers (cache, deduplication, queue, monitor) for the
/// lifetime of the process and orchestrates them behind two calls:
/// [`optimized_fetch`](Self::optimized_fetch) and
/// [`batch_requests`](Self::batch_requests).
pub struct SlipstreamClient {
    config: SlipstreamConfig,
    cache: Arc<ResponseCache>,
    dedup: DedupManager,
    queue: RequestQueue,
    monitor: Arc<PerformanceMonitor>,
}

impl SlipstreamClient {
    /// Creates a client executing requests through `transport`.
    #[must_use]
    pub fn new(config: SlipstreamConfig, transport: Arc<dyn Transport>) -> Self {
        let queue_config = QueueConfig {
            max_concurrent: config.max_concurrent,
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay(),
            request_timeout: config.request_timeout(),
        };

        Self {
            cache: Arc::new(ResponseCache::new(config.cache_max_entries, config.cache_ttl())),
            dedup: DedupManager::new(config.dedup_ttl(), config.cache_max_entries),
            queue: RequestQueue::new(queue_config, transport),
            monitor: Arc::new(PerformanceMonitor::new()),
            config,
        }
    }

    /// Creates a client with the production HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client fails to build.
    pub fn with_http_transport(config: SlipstreamConfig) -> Result<Self, FetchError> {
        let transport = Arc::new(HttpTransport::new()?);
        Ok(Self::new(config, transport))
    }

    /// Fetches `url`, applying caching, deduplication, queueing, and
    /// metrics recording per the configuration.
    ///
    /// # Errors
    ///
    /// Surfaces the underlying failure unchanged: transport and status
    /// errors exhaust the retry budget as [`FetchError::QueueExhausted`];
    /// unparseable bodies are [`FetchError::InvalidResponse`]. Error
    /// responses are never cached.
    pub async fn optimized_fetch(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<Payload, FetchError> {
        let key = RequestKey::canonical(url, options);

        if self.config.enable_caching {
            if let Some(payload) = self.cache.get(&key) {
                debug!(key = %key, "cache hit");
                self.monitor.record_request(RequestOutcome {
                    success: true,
                    from_cache: true,
                    ..Default::default()
                });
                return Ok(payload);
            }
        }

        // The dedup manager's short-lived result cache counts as a cache
        // hit too, so repeats are not undercounted when the main cache is
        // disabled.
        if self.config.enable_deduplication {
            if let Some(payload) = self.dedup.recent(&key) {
                debug!(key = %key, "recent result hit");
                self.monitor.record_request(RequestOutcome {
                    success: true,
                    from_cache: true,
                    ..Default::default()
                });
                return Ok(payload);
            }
        }

        let descriptor = RequestDescriptor::new(url, options.clone());
        let queue = self.queue.clone();
        let monitor = Arc::clone(&self.monitor);
        let operation = move || execute_and_record(queue, monitor, descriptor);

        let result = if self.config.enable_deduplication {
            self.dedup.deduplicate(key.clone(), operation).await
        } else {
            operation().await
        };

        if self.config.enable_caching {
            if let Ok(payload) = &result {
                self.cache.set(key, payload.clone());
            }
        }

        result
    }

    /// Executes `requests` in chunks of `max_concurrent`. Within a chunk
    /// every request runs concurrently and settles independently; a failed
    /// item never aborts its siblings or later chunks. Outcomes land at
    /// their original indices in the returned [`BatchOutcome`].
    pub async fn batch_requests(&self, requests: &[BatchRequest]) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            results: vec![None; requests.len()],
            errors: vec![None; requests.len()],
        };

        for (chunk_index, chunk) in requests.chunks(self.config.max_concurrent).enumerate() {
            let base = chunk_index * self.config.max_concurrent;
            let settled = join_all(chunk.iter().enumerate().map(|(offset, request)| {
                let index = base + offset;
                async move { (index, self.optimized_fetch(&request.url, &request.options).await) }
            }))
            .await;

            for (index, result) in settled {
                match result {
                    Ok(payload) => outcome.results[index] = Some(payload),
                    Err(error) => {
                        warn!(index = index, error = %error, "batch item failed");
                        outcome.errors[index] = Some(error);
                    }
                }
            }
        }

        outcome
    }

    /// Current aggregate metrics.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.monitor.get_metrics()
    }

    /// Current response cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The performance monitor, for observer registration.
    #[must_use]
    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SlipstreamConfig {
        &self.config
    }
}

/// Runs one queued request, parses its body, and records the timed
/// outcome. When deduplication is enabled this executes once per coalesced
/// group, so each network execution records exactly one monitor event.
async fn execute_and_record(
    queue: RequestQueue,
    monitor: Arc<PerformanceMonitor>,
    descriptor: RequestDescriptor,
) -> Result<Payload, FetchError> {
    let started = Instant::now();

    match queue.add_request(descriptor).await {
        Ok(response) => match serde_json::from_slice::<serde_json::Value>(&response.body) {
            Ok(value) => {
                monitor.record_request(RequestOutcome {
                    success: true,
                    response_time: Some(started.elapsed()),
                    data_size: Some(response.body.len() as u64),
                    from_cache: false,
                });
                Ok(Arc::new(value))
            }
            Err(parse_error) => {
                monitor.record_request(RequestOutcome {
                    success: false,
                    response_time: Some(started.elapsed()),
                    ..Default::default()
                });
                Err(FetchError::InvalidResponse(parse_error.to_string()))
            }
        },
        Err(error) => {
            monitor.record_request(RequestOutcome {
                success: false,
                response_time: Some(started.elapsed()),
                ..Default::default()
            });
            Err(error)
        }
    }
}
