//! Concurrency-bounded FIFO request queue with bounded linear-backoff retry.
//!
//! Fresh requests dispatch in submission order while at most
//! `max_concurrent` are executing. A failed attempt re-enqueues onto a
//! separate retry deque that is always drained before fresh arrivals, so
//! retries take priority over new traffic. Under sustained failure this
//! can starve fresh requests; known trade-off.
//!
//! Every admission check and counter mutation happens under one mutex
//! guard with no await point while it is held. That is what makes the
//! bounded-concurrency invariant hold on a preemptive runtime: two tasks
//! can never both pass the admission check for the same execution slot.
//!
//! Item lifecycle:
//!
//! ```text
//! QUEUED ──► EXECUTING ──► SUCCEEDED
//!    ▲            │
//!    │            ├──► RETRY_SCHEDULED (attempt < retry_attempts)
//!    └────────────┘        sleep(retry_delay * attempt)
//!                 │
//!                 └──► FAILED_PERMANENT (QueueExhausted)
//! ```

use crate::{
    error::FetchError,
    key::RequestDescriptor,
    transport::{Transport, TransportResponse},
};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Truncation limit for error-body excerpts carried in `HttpStatus` errors.
const ERROR_BODY_EXCERPT_LEN: usize = 256;

/// Queue limits and retry policy.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of requests executing at once.
    pub max_concurrent: usize,
    /// Total attempts per request before `QueueExhausted`.
    pub retry_attempts: u32,
    /// Base retry delay; attempt `n` waits `retry_delay * n`.
    pub retry_delay: Duration,
    /// Per-attempt timeout.
    pub request_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

type ResultTx = oneshot::Sender<Result<TransportResponse, FetchError>>;

struct QueueItem {
    descriptor: RequestDescriptor,
    result_tx: ResultTx,
    /// Number of attempts already performed.
    attempt: u32,
}

struct QueueState {
    fresh: VecDeque<QueueItem>,
    retry: VecDeque<QueueItem>,
    executing: usize,
}

struct QueueInner {
    state: Mutex<QueueState>,
    transport: Arc<dyn Transport>,
    config: QueueConfig,
}

/// Handle to the request queue. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl RequestQueue {
    /// Creates a queue executing requests through `transport`.
    #[must_use]
    pub fn new(config: QueueConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    fresh: VecDeque::new(),
                    retry: VecDeque::new(),
                    executing: 0,
                }),
                transport,
                config,
            }),
        }
    }

    /// Submits a request and waits for its terminal outcome.
    ///
    /// # Errors
    ///
    /// - [`FetchError::QueueExhausted`] after `retry_attempts` failed attempts
    /// - [`FetchError::QueueClosed`] if the executing task was torn down
    pub async fn add_request(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<TransportResponse, FetchError> {
        let (result_tx, result_rx) = oneshot::channel();
        {
            let mut state = self.inner.state.lock();
            state.fresh.push_back(QueueItem { descriptor, result_tx, attempt: 0 });
            trace!(depth = state.fresh.len() + state.retry.len(), "request enqueued");
        }
        QueueInner::pump(&self.inner);

        result_rx.await.map_err(|_| FetchError::QueueClosed)?
    }

    /// Number of items waiting to be dispatched (fresh + retry).
    #[must_use]
    pub fn depth(&self) -> usize {
        let state = self.inner.state.lock();
        state.fresh.len() + state.retry.len()
    }

    /// Number of items currently executing.
    #[must_use]
    pub fn executing(&self) -> usize {
        self.inner.state.lock().executing
    }
}

impl QueueInner {
    /// Dispatches queued items while capacity remains. Retries drain first.
    fn pump(inner: &Arc<Self>) {
        loop {
            let item = {
                let mut state = inner.state.lock();
                if state.executing >= inner.config.max_concurrent {
                    return;
                }
                let Some(item) = state.retry.pop_front().or_else(|| state.fresh.pop_front())
                else {
                    return;
                };
                state.executing += 1;
                item
            };

            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                Self::execute(inner, item).await;
            });
        }
    }

    /// Runs one attempt and routes the outcome: resolve, schedule a retry,
    /// or reject with `QueueExhausted`.
    async fn execute(inner: Arc<Self>, mut item: QueueItem) {
        let attempt = item.attempt + 1;
        let url = item.descriptor.url.clone();

        let outcome = match tokio::time::timeout(
            inner.config.request_timeout,
            inner.transport.send(&item.descriptor),
        )
        .await
        {
            Ok(Ok(response)) if response.is_success() => Ok(response),
            Ok(Ok(response)) => {
                let status = response.status;
                Err(FetchError::HttpStatus { status, message: body_excerpt(&response) })
            }
            Ok(Err(error)) => Err(error),
            Err(_) => Err(FetchError::Timeout),
        };

        match outcome {
            Ok(response) => {
                trace!(url = %url, attempt = attempt, "request succeeded");
                let _ = item.result_tx.send(Ok(response));
            }
            Err(error) if attempt < inner.config.retry_attempts => {
                let delay = inner.config.retry_delay * attempt;
                debug!(
                    url = %url,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "attempt failed, retry scheduled"
                );
                item.attempt = attempt;

                let retry_inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    {
                        retry_inner.state.lock().retry.push_back(item);
                    }
                    Self::pump(&retry_inner);
                });
            }
            Err(error) => {
                warn!(url = %url, attempts = attempt, error = %error, "retry budget exhausted");
                let _ = item.result_tx.send(Err(FetchError::QueueExhausted {
                    attempts: attempt,
                    last_error: Box::new(error),
                }));
            }
        }

        {
            let mut state = inner.state.lock();
            state.executing -= 1;
        }
        Self::pump(&inner);
    }
}

fn body_excerpt(response: &TransportResponse) -> String {
    let text = String::from_utf8_lossy(&response.body);
    if text.len() > ERROR_BODY_EXCERPT_LEN {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i <= ERROR_BODY_EXCERPT_LEN)
            .last()
            .map_or(0, |(i, _)| i);
        format!("{}... (truncated)", &text[..cut])
    } else {
        text.into_owned()
    }
}
