//! Results of a remote call, as seen by the dispatcher.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token usage reported by the remote API.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct Usage {
    /// Tokens in the prompt/input.
    prompt_tokens: u64,
    /// Tokens in the response/output.
    completion_tokens: u64,
    /// Total tokens (prompt + completion).
    total_tokens: u64,
}

impl Usage {
    /// Create a new usage record.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// The useful part of a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// Generated text of a completion
    Completion {
        /// Assistant message content
        text: String,
    },
    /// Embedding vector
    Embedding {
        /// Vector components
        vector: Vec<f32>,
    },
}

/// Why a failed call is worth another attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecoverableReason {
    /// The server reported a rate limit (HTTP 429)
    RateLimited,
    /// Connection failure or timeout
    TransientNetwork,
    /// The server failed (HTTP 5xx)
    ServerError,
}

/// Why a job will never succeed unchanged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermanentReason {
    /// Malformed or oversized request
    InvalidRequest,
    /// Missing or rejected credentials
    Authentication,
    /// Rejected by the provider's content policy
    ContentPolicy,
    /// A recoverable failure repeated until the attempt cap
    RetriesExhausted,
}

/// Classified result of one remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The call succeeded
    Success {
        /// Response content
        response: ResponsePayload,
        /// Tokens actually consumed
        usage: Usage,
    },
    /// The call failed but may succeed if retried
    Recoverable {
        /// Failure class
        reason: RecoverableReason,
        /// Error detail
        message: String,
        /// Server-suggested delay before retrying
        retry_after: Option<Duration>,
    },
    /// The call failed and retrying will not help
    Permanent {
        /// Failure class
        reason: PermanentReason,
        /// Error detail
        message: String,
    },
}

impl Outcome {
    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
