//! End-to-end tests over a real HTTP connection to a mock server.
//!
//! These run on the real clock (no pausing: the transport performs actual
//! socket I/O), so they use configurations that avoid long backoff sleeps.

use mockito::Matcher;
use serde_json::json;
use slipstream_core::{
    FetchError, Method, RequestOptions, SlipstreamClient, SlipstreamConfig,
};
use std::collections::BTreeMap;

fn client(config: SlipstreamConfig) -> SlipstreamClient {
    SlipstreamClient::with_http_transport(config).expect("http client builds")
}

#[tokio::test]
async fn test_get_roundtrip_and_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/users")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"users":[{"id":1,"name":"amara"}]}"#)
        .create_async()
        .await;

    let client = client(SlipstreamConfig::default());
    let url = format!("{}/api/users", server.url());

    let payload = client.optimized_fetch(&url, &RequestOptions::default()).await.expect("fetch");
    assert_eq!(payload["users"][0]["name"], "amara");

    // The repeat is served from cache; the server sees exactly one request.
    client.optimized_fetch(&url, &RequestOptions::default()).await.expect("cached");
    mock.assert_async().await;

    let metrics = client.metrics();
    assert_eq!(metrics.total_requests, 2);
    assert!(metrics.total_data_transferred > 0);
}

#[tokio::test]
async fn test_post_sends_headers_and_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/items")
        .match_header("x-request-source", "slipstream-test")
        .match_body(Matcher::Json(json!({"name": "widget"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"created":true}"#)
        .create_async()
        .await;

    let client = client(SlipstreamConfig::default());
    let options = RequestOptions {
        method: Method::Post,
        headers: BTreeMap::from([(
            "x-request-source".to_string(),
            "slipstream-test".to_string(),
        )]),
        body: Some(json!({"name": "widget"})),
    };

    let payload = client
        .optimized_fetch(&format!("{}/api/items", server.url()), &options)
        .await
        .expect("post");
    assert_eq!(payload["created"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_exhausts_retry_budget() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/missing")
        .with_status(404)
        .with_body(r#"{"error":"no such resource"}"#)
        .expect(1)
        .create_async()
        .await;

    let config = SlipstreamConfig {
        retry_attempts: 1,
        retry_delay_ms: 10,
        ..SlipstreamConfig::default()
    };
    let client = client(config);

    let error = client
        .optimized_fetch(&format!("{}/api/missing", server.url()), &RequestOptions::default())
        .await
        .expect_err("404 must fail");

    match error {
        FetchError::QueueExhausted { attempts, last_error } => {
            assert_eq!(attempts, 1);
            match *last_error {
                FetchError::HttpStatus { status, ref message } => {
                    assert_eq!(status, 404);
                    assert!(message.contains("no such resource"));
                }
                ref other => panic!("expected HttpStatus, got {other:?}"),
            }
        }
        other => panic!("expected QueueExhausted, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_server_surfaces_transport_error() {
    let config = SlipstreamConfig {
        retry_attempts: 1,
        retry_delay_ms: 10,
        request_timeout_ms: 2000,
        ..SlipstreamConfig::default()
    };
    let client = client(config);

    // Port 1 refuses the connection; no response is ever received.
    let error = client
        .optimized_fetch("http://127.0.0.1:1/api/users", &RequestOptions::default())
        .await
        .expect_err("connection must fail");

    match error {
        FetchError::QueueExhausted { attempts, last_error } => {
            assert_eq!(attempts, 1);
            assert!(matches!(*last_error, FetchError::Transport(_) | FetchError::Timeout));
        }
        other => panic!("expected QueueExhausted, got {other:?}"),
    }
}
