use thiserror::Error;

/// Provider-call errors. [`LlmError::is_retryable`] drives the retry
/// policy: transient failures are retried, everything else surfaces
/// immediately.
#[derive(Debug, Error, Clone)]
pub enum LlmError {
    /// Authentication or permission failure. Never retried.
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: retry after {retry_after:?}s")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout")]
    Timeout,

    /// Malformed request rejected by the provider. Never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Middleware short-circuited the call before it was made.
    #[error("LLM call aborted by middleware: {0}")]
    Aborted(String),
}

impl LlmError {
    /// Transient failures worth retrying: timeouts, rate limits, 5xx and
    /// connectivity errors. Auth failures and 4xx are fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout | LlmError::RateLimitExceeded { .. } | LlmError::Network(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::Authentication(_) | LlmError::InvalidRequest(_) | LlmError::Aborted(_) => {
                false
            }
        }
    }
}
