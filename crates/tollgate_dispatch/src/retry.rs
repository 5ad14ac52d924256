//! Outcome classification and backoff.

use std::time::Duration;
use tollgate_core::{Outcome, PermanentReason, RecoverableReason, RetryConfig};
use tollgate_error::{ApiError, ApiErrorKind, RetryableError};
use tollgate_interface::ApiResponse;

/// What to do with a job after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Record the success.
    Success,
    /// Re-enter admission after the delay.
    RetryAfter(Duration),
    /// Record a terminal failure.
    Abandon,
}

/// Decides whether and when a failed job runs again.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tollgate_core::{Outcome, RecoverableReason, RetryConfig};
/// use tollgate_dispatch::{Decision, RetryController};
///
/// let retry = RetryController::new(RetryConfig::default().with_jitter(false));
/// let outcome = Outcome::Recoverable {
///     reason: RecoverableReason::ServerError,
///     message: "502".to_string(),
///     retry_after: None,
/// };
///
/// assert_eq!(retry.classify(&outcome, 1), Decision::RetryAfter(Duration::from_secs(2)));
/// assert_eq!(retry.classify(&outcome, 5), Decision::Abandon);
/// ```
#[derive(Debug, Clone)]
pub struct RetryController {
    config: RetryConfig,
}

impl RetryController {
    /// Creates a controller with the given policy.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The policy in use.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decides the fate of a job that has made `attempts` attempts.
    pub fn classify(&self, outcome: &Outcome, attempts: u32) -> Decision {
        match outcome {
            Outcome::Success { .. } => Decision::Success,
            Outcome::Permanent { .. } => Decision::Abandon,
            Outcome::Recoverable { .. } if attempts >= *self.config.max_attempts() => {
                Decision::Abandon
            }
            Outcome::Recoverable { retry_after, .. } => {
                Decision::RetryAfter(self.delay(attempts, *retry_after))
            }
        }
    }

    /// Backoff before the attempt following attempt number `attempts`.
    ///
    /// `base * 2^(attempts - 1)` with equal jitter (half fixed, half random),
    /// raised to the server's hint when it asks for longer, and capped at
    /// `max_delay`.
    pub fn delay(&self, attempts: u32, hint: Option<Duration>) -> Duration {
        let max_delay = self.config.max_delay();
        let shift = attempts.saturating_sub(1).min(31);
        let exponential = self
            .config
            .base_delay()
            .saturating_mul(1u32 << shift)
            .min(max_delay);

        let delay = if *self.config.jitter() {
            let half = exponential / 2;
            half + tokio_retry2::strategy::jitter(exponential - half)
        } else {
            exponential
        };

        hint.map_or(delay, |hint| delay.max(hint)).min(max_delay)
    }

    /// Maps the result of a remote call onto an [`Outcome`].
    pub fn outcome_of(result: Result<ApiResponse, ApiError>) -> Outcome {
        let error = match result {
            Ok(response) => {
                let (response, usage) = response.into_parts();
                return Outcome::Success { response, usage };
            }
            Err(error) => error,
        };

        let retry_after = error.suggested_delay();
        let message = error.kind.to_string();
        let recoverable = |reason| Outcome::Recoverable {
            reason,
            message: message.clone(),
            retry_after,
        };
        let permanent = |reason| Outcome::Permanent {
            reason,
            message: message.clone(),
        };

        match &error.kind {
            ApiErrorKind::Http { status: 429, .. } => recoverable(RecoverableReason::RateLimited),
            ApiErrorKind::Http { status: 408, .. }
            | ApiErrorKind::Network(_)
            | ApiErrorKind::Timeout(_) => recoverable(RecoverableReason::TransientNetwork),
            ApiErrorKind::Http {
                status: 401 | 403, ..
            }
            | ApiErrorKind::MissingApiKey => permanent(PermanentReason::Authentication),
            kind if kind.is_content_policy() => permanent(PermanentReason::ContentPolicy),
            kind if kind.is_retryable() => recoverable(RecoverableReason::ServerError),
            _ => permanent(PermanentReason::InvalidRequest),
        }
    }
}
