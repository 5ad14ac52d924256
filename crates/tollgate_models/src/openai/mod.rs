//! OpenAI chat completion and embedding backend.

mod client;
mod dto;

pub use client::{
    MAX_RETRY_AFTER, OPENAI_API_URL, OpenAIClient, error_from_status, retry_after,
};
pub use dto::{
    ChatChoice, ChatMessage, ChatRequest, ChatRequestBuilder, ChatRequestBuilderError,
    ChatResponse, EmbeddingData, EmbeddingRequest, EmbeddingRequestBuilder,
    EmbeddingRequestBuilderError, EmbeddingResponse, TokenUsage,
};
