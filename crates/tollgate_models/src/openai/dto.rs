//! OpenAI wire types for chat completions and embeddings.

use serde::{Deserialize, Serialize};
use tollgate_core::{ResponsePayload, Usage};
use tollgate_error::{ApiError, ApiErrorKind};
use tollgate_interface::{ApiRequest, ApiResponse};

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    /// Creates a message with the given role.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(
    Debug, Clone, PartialEq, Serialize, derive_getters::Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a new builder.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }
}

impl From<&ApiRequest> for ChatRequest {
    fn from(request: &ApiRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt() {
            messages.push(ChatMessage::new("system", system.clone()));
        }
        messages.push(ChatMessage::new("user", request.text().clone()));

        Self {
            model: request.model().clone(),
            messages,
            max_tokens: *request.max_tokens(),
        }
    }
}

/// Token accounting reported by OpenAI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, derive_getters::Getters)]
pub struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl From<TokenUsage> for Usage {
    fn from(usage: TokenUsage) -> Self {
        Usage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

/// One generated choice.
#[derive(Debug, Clone, PartialEq, Deserialize, derive_getters::Getters)]
pub struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Response of `POST /chat/completions`.
#[derive(Debug, Clone, PartialEq, Deserialize, derive_getters::Getters)]
pub struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

impl TryFrom<ChatResponse> for ApiResponse {
    type Error = ApiError;

    fn try_from(response: ChatResponse) -> Result<Self, Self::Error> {
        let usage = response.usage.unwrap_or_default().into();
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ApiError::new(ApiErrorKind::Decode(
                "Completion response has no choices".to_string(),
            ))
        })?;

        Ok(ApiResponse::new(
            ResponsePayload::Completion {
                text: choice.message.content,
            },
            usage,
        ))
    }
}

/// Body of `POST /embeddings`.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct EmbeddingRequest {
    model: String,
    input: String,
    #[builder(default = "\"float\".to_string()")]
    encoding_format: String,
}

impl EmbeddingRequest {
    /// Creates a new builder.
    pub fn builder() -> EmbeddingRequestBuilder {
        EmbeddingRequestBuilder::default()
    }
}

impl From<&ApiRequest> for EmbeddingRequest {
    fn from(request: &ApiRequest) -> Self {
        Self {
            model: request.model().clone(),
            input: request.text().clone(),
            encoding_format: "float".to_string(),
        }
    }
}

/// One embedding vector.
#[derive(Debug, Clone, PartialEq, Deserialize, derive_getters::Getters)]
pub struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Response of `POST /embeddings`.
#[derive(Debug, Clone, PartialEq, Deserialize, derive_getters::Getters)]
pub struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

impl TryFrom<EmbeddingResponse> for ApiResponse {
    type Error = ApiError;

    fn try_from(response: EmbeddingResponse) -> Result<Self, Self::Error> {
        let usage = response.usage.unwrap_or_default().into();
        let data = response
            .data
            .into_iter()
            .min_by_key(|data| data.index)
            .ok_or_else(|| {
                ApiError::new(ApiErrorKind::Decode(
                    "Embedding response has no data".to_string(),
                ))
            })?;

        Ok(ApiResponse::new(
            ResponsePayload::Embedding {
                vector: data.embedding,
            },
            usage,
        ))
    }
}

/// Error body OpenAI attaches to non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
}
