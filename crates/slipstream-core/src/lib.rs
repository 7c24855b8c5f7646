//! # Slipstream Core
//!
//! A client-side network request optimization layer that sits between UI
//! callers and a remote HTTP API.
//!
//! This crate provides the foundational components for:
//!
//! - **[`cache`]**: bounded TTL response cache with FIFO eviction and lazy
//!   expiry on read.
//!
//! - **[`dedup`]**: deduplication of concurrent identical requests —
//!   coalesces callers onto one in-flight execution and keeps a short-TTL
//!   cache of settled results.
//!
//! - **[`queue`]**: concurrency-bounded FIFO request queue with bounded
//!   retry and linear backoff; retries dispatch ahead of fresh arrivals.
//!
//! - **[`monitor`]**: aggregating performance monitor — cumulative moving
//!   averages for latency and cache-hit rate, observer fan-out with
//!   per-subscriber panic isolation, `metrics` facade emission.
//!
//! - **[`client`]**: the facade (`optimized_fetch`, `batch_requests`)
//!   orchestrating the above, with chunked batch execution and
//!   partial-failure isolation.
//!
//! - **[`transport`]**: the injected HTTP capability (trait plus a
//!   production `reqwest` implementation).
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      SlipstreamClient                      │
//! │  ┌───────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ ResponseCache │  │ DedupManager │  │ PerformanceMon. │  │
//! │  └───────┬───────┘  └──────┬───────┘  └────────┬────────┘  │
//! │          │                 │                   │           │
//! │          │          ┌──────▼───────┐    ┌──────▼───────┐   │
//! │          │          │ RequestQueue │    │  observers   │   │
//! │          │          └──────┬───────┘    └──────────────┘   │
//! │          │                 │                               │
//! │          │          ┌──────▼───────┐                       │
//! │          └─────────►│  Transport   │                       │
//! │                     └──────────────┘                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Request flow: caller → facade → cache lookup → (miss) deduplication →
//! (not in flight) queue → transport → result written to cache → monitor
//! updated → result returned to all coalesced callers.

use std::sync::Arc;

pub mod cache;
pub mod client;
pub mod config;
pub mod dedup;
pub mod error;
pub mod key;
pub mod monitor;
pub mod queue;
pub mod transport;

/// A parsed response payload, shared between the cache and every caller.
pub type Payload = Arc<serde_json::Value>;

pub use cache::{CacheStats, ResponseCache};
pub use client::{BatchOutcome, BatchRequest, SlipstreamClient};
pub use config::SlipstreamConfig;
pub use dedup::DedupManager;
pub use error::FetchError;
pub use key::{Method, RequestDescriptor, RequestKey, RequestOptions};
pub use monitor::{MetricsSnapshot, ObserverId, PerformanceMonitor, RequestOutcome};
pub use queue::{QueueConfig, RequestQueue};
pub use transport::{HttpTransport, Transport, TransportResponse};
