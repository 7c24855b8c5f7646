use thiserror::Error;

/// Errors surfaced by the optimization layer.
///
/// The type is `Clone` because the deduplication manager fans a single
/// settlement out to every coalesced waiter through a shared future, and
/// each waiter receives its own copy of the outcome. Network errors from
/// the underlying client are sanitized into strings at the transport
/// boundary rather than wrapped, which is what makes cloning possible.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// No response was received (connectivity failure). Retried by the
    /// request queue up to the configured limit.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response was received with a non-success HTTP status. Carries the
    /// status code and a truncated body excerpt. Retried regardless of
    /// status class; see `is_transient` for the finer classification.
    #[error("HTTP status {status}: {message}")]
    HttpStatus {
        /// HTTP status code of the response.
        status: u16,
        /// Truncated response body for diagnostics.
        message: String,
    },

    /// The per-attempt request timeout elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The retry budget was exhausted. Terminal; carries the error from the
    /// final attempt.
    #[error("retry budget exhausted after {attempts} attempts: {last_error}")]
    QueueExhausted {
        /// Total number of attempts performed.
        attempts: u32,
        /// Error produced by the last attempt.
        last_error: Box<FetchError>,
    },

    /// The response body could not be parsed. Terminal: a response was
    /// received, so re-requesting the same bytes cannot help.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request queue was shut down while the request was in flight.
    #[error("request queue closed")]
    QueueClosed,
}

impl FetchError {
    /// Returns `true` if this error is transient and a retry may succeed.
    ///
    /// Transient errors:
    /// - Transport failures (temporary connectivity issues)
    /// - Timeouts (network congestion, slow server)
    /// - HTTP 5xx server errors and 429 rate limiting
    ///
    /// Note: the queue's retry policy currently retries *all* `HttpStatus`
    /// failures; this helper exists so that tightening the policy later is
    /// a one-line change.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::HttpStatus { status, .. } => (500..=599).contains(status) || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this error is permanent and retrying won't help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::InvalidResponse(_) | Self::QueueExhausted { .. } | Self::QueueClosed => true,
            Self::HttpStatus { status, .. } => (400..=499).contains(status) && *status != 429,
            _ => false,
        }
    }

    /// Returns a static string representation for metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::HttpStatus { .. } => "http_status",
            Self::Timeout => "timeout",
            Self::QueueExhausted { .. } => "queue_exhausted",
            Self::InvalidResponse(_) => "invalid_response",
            Self::QueueClosed => "queue_closed",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        Self::Transport(sanitize_network_error(&error))
    }
}

/// Sanitizes network errors to prevent information disclosure in logs and
/// caller-facing messages.
fn sanitize_network_error(error: &reqwest::Error) -> String {
    if error.is_connect() {
        "connection refused or unreachable".to_string()
    } else if error.is_request() {
        "request failed".to_string()
    } else if error.is_body() {
        "response body error".to_string()
    } else if error.is_decode() {
        "response decode error".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else {
        "network error".to_string()
    }
}
