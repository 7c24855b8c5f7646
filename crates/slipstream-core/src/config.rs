//! Layer configuration with layered loading.
//!
//! Configuration is resolved in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: the values documented on each field
//! 2. **Config file**: TOML file named by the `SLIPSTREAM_CONFIG` env var
//! 3. **Environment variables**: `SLIPSTREAM_*` vars override single fields
//!
//! Invalid configurations (zero cache capacity, zero concurrency, zero
//! retry budget) are rejected at load time rather than failing silently.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Configuration for the request optimization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlipstreamConfig {
    /// Coalesce concurrent identical requests into one execution. Defaults to `true`.
    #[serde(default = "default_enable_deduplication")]
    pub enable_deduplication: bool,

    /// Serve repeated requests from the TTL response cache. Defaults to `true`.
    #[serde(default = "default_enable_caching")]
    pub enable_caching: bool,

    /// Response cache time-to-live in milliseconds. Defaults to `300000` (5 minutes).
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Maximum number of entries in the response cache. Oldest-inserted is
    /// evicted on overflow. Must be greater than 0. Defaults to `500`.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Time-to-live of the deduplication manager's short result cache, in
    /// milliseconds. Defaults to `30000`.
    #[serde(default = "default_dedup_ttl_ms")]
    pub dedup_ttl_ms: u64,

    /// Maximum number of requests executing at once. Also the batch chunk
    /// size. Must be greater than 0. Defaults to `5`.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Total attempts per request before giving up. Must be greater than 0.
    /// Defaults to `3`.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base retry delay in milliseconds; the actual delay is this value
    /// multiplied by the attempt number (linear backoff). Defaults to `1000`.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-attempt timeout in milliseconds. A timed-out attempt counts as a
    /// failed attempt and is retried. Defaults to `30000`.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_enable_deduplication() -> bool {
    true
}

fn default_enable_caching() -> bool {
    true
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}

fn default_cache_max_entries() -> usize {
    500
}

fn default_dedup_ttl_ms() -> u64 {
    30_000
}

fn default_max_concurrent() -> usize {
    5
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for SlipstreamConfig {
    fn default() -> Self {
        Self {
            enable_deduplication: default_enable_deduplication(),
            enable_caching: default_enable_caching(),
            cache_ttl_ms: default_cache_ttl_ms(),
            cache_max_entries: default_cache_max_entries(),
            dedup_ttl_ms: default_dedup_ttl_ms(),
            max_concurrent: default_max_concurrent(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SlipstreamConfig {
    /// Loads configuration from the optional `SLIPSTREAM_CONFIG` TOML file
    /// and `SLIPSTREAM_*` environment variables, layered over compiled
    /// defaults, then validates it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a source cannot be read, a field fails
    /// to deserialize, or validation rejects the resolved values.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Ok(path) = std::env::var("SLIPSTREAM_CONFIG") {
            builder = builder.add_source(File::from(Path::new(&path)));
        }

        let resolved = builder
            .add_source(Environment::with_prefix("SLIPSTREAM").try_parsing(true))
            .build()?;

        let config: Self = resolved.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Message`] naming the offending field when a
    /// bound is zero where the algorithms require it to be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_max_entries == 0 {
            return Err(ConfigError::Message("cache_max_entries must be greater than 0".into()));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::Message("max_concurrent must be greater than 0".into()));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Message("retry_attempts must be greater than 0".into()));
        }
        Ok(())
    }

    /// Response cache TTL as a [`Duration`].
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Deduplication result cache TTL as a [`Duration`].
    #[must_use]
    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_millis(self.dedup_ttl_ms)
    }

    /// Base retry delay as a [`Duration`].
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Per-attempt timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
