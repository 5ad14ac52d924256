//! Remote inference API errors and retry classification.

use std::time::Duration;

/// Failure conditions reported by (or while talking to) the remote API.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ApiErrorKind {
    /// API key not found in environment
    #[display("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,
    /// The server answered with a non-success status
    #[display("HTTP {} error: {}", status, message)]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
        /// Server-suggested delay before retrying, if any
        retry_after: Option<Duration>,
    },
    /// The request never produced a response (connect, reset, DNS)
    #[display("Network error: {}", _0)]
    Network(String),
    /// The call exceeded the configured timeout
    #[display("Request timed out after {:?}", _0)]
    Timeout(Duration),
    /// A success response could not be decoded
    #[display("Failed to decode response: {}", _0)]
    Decode(String),
}

impl ApiErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiErrorKind::Http { status, .. } => {
                matches!(*status, 408 | 409 | 429 | 500 | 502 | 503 | 504)
            }
            ApiErrorKind::Network(_) | ApiErrorKind::Timeout(_) | ApiErrorKind::Decode(_) => true,
            ApiErrorKind::MissingApiKey => false,
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiErrorKind::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server refused the payload on content-policy grounds.
    ///
    /// OpenAI reports these as 400s whose body carries a policy code.
    pub fn is_content_policy(&self) -> bool {
        match self {
            ApiErrorKind::Http { status, message, .. } => {
                *status == 400
                    && (message.contains("content_policy") || message.contains("content_filter"))
            }
            _ => false,
        }
    }
}

/// Remote API error with source location tracking.
///
/// # Examples
///
/// ```
/// use tollgate_error::{ApiError, ApiErrorKind};
///
/// let err = ApiError::new(ApiErrorKind::MissingApiKey);
/// assert!(format!("{}", err).contains("OPENAI_API_KEY"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("API Error: {} at line {} in {}", kind, line, file)]
pub struct ApiError {
    /// The kind of error that occurred
    pub kind: ApiErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ApiError {
    /// Create a new ApiError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ApiErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for an HTTP status failure without a retry hint.
    #[track_caller]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Http {
            status,
            message: message.into(),
            retry_after: None,
        })
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tollgate_error::{ApiError, ApiErrorKind, RetryableError};
///
/// let err = ApiError::new(ApiErrorKind::Http {
///     status: 429,
///     message: "Rate limit reached".to_string(),
///     retry_after: Some(Duration::from_secs(7)),
/// });
///
/// assert!(err.is_retryable());
/// assert_eq!(err.suggested_delay(), Some(Duration::from_secs(7)));
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503 (service unavailable), 429 (rate limit),
    /// or network timeouts should return true. Permanent errors like 401
    /// (unauthorized) or 400 (bad request) should return false.
    fn is_retryable(&self) -> bool;

    /// Delay the server asked for before the next attempt, if any.
    fn suggested_delay(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for ApiError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn suggested_delay(&self) -> Option<Duration> {
        match &self.kind {
            ApiErrorKind::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
