use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error surfaced by a provider transport or by the executor itself.
///
/// The executor never wraps these: the error a failed operation returned is
/// the error the caller receives, so callers can keep pattern-matching on the
/// underlying cause after retries are exhausted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        /// Server-provided Retry-After hint in seconds, when present.
        retry_after: Option<u64>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// Convenience constructor for an HTTP error without a Retry-After hint.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// HTTP status associated with this error. Network-level failures
    /// (connection errors, timeouts) report status 0.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Network(_) | ApiError::Timeout { .. } | ApiError::Cancelled => 0,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Http { message, .. } => message,
            ApiError::Network(message) => message,
            ApiError::Timeout { .. } | ApiError::Cancelled => "",
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ApiError::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }
}
