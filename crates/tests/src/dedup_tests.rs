//! Deduplication behavior through the client facade.

use crate::mock_infrastructure::MockTransport;
use serde_json::json;
use slipstream_core::{FetchError, RequestOptions, SlipstreamClient, SlipstreamConfig};
use std::{sync::Arc, time::Duration};

fn options() -> RequestOptions {
    RequestOptions::default()
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_fetches_coalesce() {
    let transport = Arc::new(MockTransport::with_delay(
        Duration::from_millis(50),
        json!({"user": "amara"}),
    ));
    let client = SlipstreamClient::new(SlipstreamConfig::default(), transport.clone());

    let options = options();
    let (first, second) = tokio::join!(
        client.optimized_fetch("/api/user/1", &options),
        client.optimized_fetch("/api/user/1", &options),
    );

    let first = first.expect("first caller succeeds");
    let second = second.expect("second caller succeeds");
    assert_eq!(*first, *second);
    assert_eq!(transport.total_calls(), 1, "both callers share one execution");
}

#[tokio::test(start_paused = true)]
async fn test_coalesced_failure_reaches_every_caller() {
    let transport = Arc::new(MockTransport::failing());
    let config = SlipstreamConfig { retry_attempts: 1, ..SlipstreamConfig::default() };
    let client = SlipstreamClient::new(config, transport.clone());

    let options = options();
    let (first, second) = tokio::join!(
        client.optimized_fetch("/api/down", &options),
        client.optimized_fetch("/api/down", &options),
    );

    for result in [first, second] {
        match result.expect_err("both callers fail") {
            FetchError::QueueExhausted { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected QueueExhausted, got {other:?}"),
        }
    }
    assert_eq!(transport.total_calls(), 1);

    // Failures are never cached, so the next caller executes again.
    client.optimized_fetch("/api/down", &options).await.expect_err("still down");
    assert_eq!(transport.total_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_urls_do_not_coalesce() {
    let transport =
        Arc::new(MockTransport::with_delay(Duration::from_millis(10), json!({"ok": true})));
    let client = SlipstreamClient::new(SlipstreamConfig::default(), transport.clone());

    let options = options();
    let (first, second) = tokio::join!(
        client.optimized_fetch("/api/user/1", &options),
        client.optimized_fetch("/api/user/2", &options),
    );
    first.expect("success");
    second.expect("success");

    assert_eq!(transport.total_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_deduplication_disabled_executes_each_caller() {
    let transport =
        Arc::new(MockTransport::with_delay(Duration::from_millis(10), json!({"ok": true})));
    let config = SlipstreamConfig { enable_deduplication: false, ..SlipstreamConfig::default() };
    let client = SlipstreamClient::new(config, transport.clone());

    // The response cache only serves settled results, so concurrent
    // identical fetches both reach the network without deduplication.
    let options = options();
    let (first, second) = tokio::join!(
        client.optimized_fetch("/api/user/1", &options),
        client.optimized_fetch("/api/user/1", &options),
    );
    first.expect("success");
    second.expect("success");

    assert_eq!(transport.total_calls(), 2);
}
