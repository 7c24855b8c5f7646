//! Integration tests for the slipstream request optimization layer.
//!
//! Test modules:
//!
//! - `dedup_tests`: concurrent-caller coalescing through the facade
//! - `queue_tests`: bounded concurrency, retry ordering, exhaustion
//! - `cache_tests`: TTL and FIFO eviction behavior through the facade
//! - `facade_tests`: batch partial-failure isolation, feature flags, metrics
//! - `http_transport_tests`: end-to-end over a mock HTTP server
//! - `mock_infrastructure`: reusable scripted transport for tests
//!
//! Timing-sensitive tests run on a paused tokio clock
//! (`#[tokio::test(start_paused = true)]`) so TTL boundaries and backoff
//! delays are asserted deterministically, without real sleeps.

pub mod mock_infrastructure;


#[cfg(test)]
mod dedup_tests;


#[cfg(test)]
mod http_transport_tests;
