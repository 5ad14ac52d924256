//! Top-level error wrapper types.

use crate::{
    ApiError, BuilderError, CheckpointError, ConfigError, DispatchError, JsonError,
    RateLimitError, TokenizerError,
};

/// Every error a Tollgate crate can surface to a caller.
///
/// # Examples
///
/// ```
/// use tollgate_error::{TollgateError, ConfigError};
///
/// let err: TollgateError = ConfigError::new("no tier named 'gold'").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum TollgateErrorKind {
    /// Remote API error
    #[from(ApiError)]
    Api(ApiError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Checkpoint persistence error
    #[from(CheckpointError)]
    Checkpoint(CheckpointError),
    /// Quota tracking error
    #[from(RateLimitError)]
    RateLimit(RateLimitError),
    /// Dispatcher error
    #[from(DispatchError)]
    Dispatch(DispatchError),
    /// Tokenizer error
    #[from(TokenizerError)]
    Tokenizer(TokenizerError),
}

/// Tollgate error with kind discrimination.
///
/// # Examples
///
/// ```
/// use tollgate_error::{TollgateResult, ConfigError};
///
/// fn might_fail() -> TollgateResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Tollgate Error: {}", _0)]
pub struct TollgateError(Box<TollgateErrorKind>);

impl TollgateError {
    /// Create a new error from a kind.
    pub fn new(kind: TollgateErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TollgateErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to TollgateErrorKind
impl<T> From<T> for TollgateError
where
    T: Into<TollgateErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Tollgate operations.
pub type TollgateResult<T> = std::result::Result<T, TollgateError>;
