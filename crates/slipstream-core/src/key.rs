//! Canonical request identity.
//!
//! Cache lookups and in-flight deduplication both key on [`RequestKey`], a
//! canonical string derived from the target URL and a normalized rendering
//! of the request options. Two logically identical requests must produce
//! the same key; semantically different requests must not collide. Header
//! maps are `BTreeMap` so their serialization order is deterministic.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// HTTP method for an outbound request. Defaults to GET.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Returns the canonical uppercase method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for an outbound request. All fields default so `{}` in a config
/// file or an empty struct in code means a plain GET.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// HTTP method. Defaults to GET.
    #[serde(default)]
    pub method: Method,

    /// Request headers. Sorted map so canonicalization is order-independent.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Optional JSON body.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

/// A fully specified outbound request: the unit of work submitted to the
/// request queue and handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Target URL.
    pub url: String,
    /// Request options.
    #[serde(default)]
    pub options: RequestOptions,
}

impl RequestDescriptor {
    /// Builds a descriptor from its parts.
    #[must_use]
    pub fn new(url: impl Into<String>, options: RequestOptions) -> Self {
        Self { url: url.into(), options }
    }

    /// Canonical key for this descriptor.
    #[must_use]
    pub fn key(&self) -> RequestKey {
        RequestKey::canonical(&self.url, &self.options)
    }
}

/// Canonical identity of a request, used for cache lookups and in-flight
/// deduplication. Cheap to clone (`Arc<str>` internally).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(Arc<str>);

impl RequestKey {
    /// Derives the canonical key for a URL and its options.
    ///
    /// The rendering is a compact JSON array of the method, the URL, the
    /// headers (lowercased names, sorted), and the body. JSON escaping
    /// keeps every component self-delimiting: no URL or header value can
    /// impersonate another component, so distinct requests never collide.
    #[must_use]
    pub fn canonical(url: &str, options: &RequestOptions) -> Self {
        let headers: BTreeMap<String, &str> = options
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
            .collect();

        let rendered =
            serde_json::json!([options.method.as_str(), url, headers, options.body]);
        Self(rendered.to_string().into())
    }

    /// Returns the canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
