//! Injected HTTP transport capability.
//!
//! The optimization layer is transport-agnostic: everything above this
//! module talks to the [`Transport`] trait. A response with a non-success
//! status is still an `Ok` here — status classification belongs to the
//! queue — while `Err` strictly means no response was received.

use crate::{
    error::FetchError,
    key::{Method, RequestDescriptor},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::trace;

/// A raw response from the remote API.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability for performing a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the exchange described by `request`.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received; responses with
    /// error statuses are returned as [`TransportResponse`] values.
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, FetchError>;
}

/// Production [`Transport`] over a pooled `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the transport with pool, timeout, and TLS settings suited to
    /// a long-lived client process.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the underlying client fails to
    /// build.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(45))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("slipstream/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                FetchError::Transport(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, FetchError> {
        let method = match request.options.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.options.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.options.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let body = response.bytes().await?;

        trace!(url = %request.url, status = status, bytes = body.len(), "transport exchange done");
        Ok(TransportResponse { status, headers, body })
    }
}
