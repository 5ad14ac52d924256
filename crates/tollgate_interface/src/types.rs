//! Request and response types at the remote API boundary.

use serde::{Deserialize, Serialize};
use tollgate_core::{Job, RequestKind, ResponsePayload, Usage};

/// A single remote call.
///
/// # Examples
///
/// ```
/// use tollgate_core::RequestKind;
/// use tollgate_interface::ApiRequest;
///
/// let request = ApiRequest::builder()
///     .model("gpt-4o-mini")
///     .kind(RequestKind::Completion)
///     .text("Summarize the independent claims.")
///     .max_tokens(256u32)
///     .build()
///     .unwrap();
///
/// assert_eq!(*request.max_tokens(), Some(256));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ApiRequest {
    /// Model identifier
    model: String,
    /// Completion or embedding
    kind: RequestKind,
    /// Prompt text or text to embed
    text: String,
    /// System message for completions
    #[builder(default, setter(strip_option))]
    system_prompt: Option<String>,
    /// Completion length cap
    #[builder(default, setter(strip_option))]
    max_tokens: Option<u32>,
}

impl ApiRequest {
    /// Creates a builder.
    pub fn builder() -> ApiRequestBuilder {
        ApiRequestBuilder::default()
    }

    /// The call a job describes.
    pub fn for_job(job: &Job) -> Self {
        let payload = job.payload();
        Self {
            model: payload.model().clone(),
            kind: job.kind(),
            text: payload.text().clone(),
            system_prompt: payload.system_prompt().clone(),
            max_tokens: *payload.max_tokens(),
        }
    }
}

/// A successful remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ApiResponse {
    /// Response content
    payload: ResponsePayload,
    /// Tokens the provider charged
    usage: Usage,
}

impl ApiResponse {
    /// Creates a response.
    pub fn new(payload: ResponsePayload, usage: Usage) -> Self {
        Self { payload, usage }
    }

    /// Splits the response into its parts.
    pub fn into_parts(self) -> (ResponsePayload, Usage) {
        (self.payload, self.usage)
    }
}
