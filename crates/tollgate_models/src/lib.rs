//! Remote inference backends for Tollgate.
//!
//! This crate provides the concrete [`InferenceBackend`] implementations the
//! dispatcher drives, plus the token counting used to size jobs before they
//! are admitted.
//!
//! # Example
//!
//! ```no_run
//! use tollgate_core::RequestKind;
//! use tollgate_interface::{ApiRequest, InferenceBackend};
//! use tollgate_models::OpenAIClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAIClient::new()?;
//! let request = ApiRequest::builder()
//!     .model("text-embedding-3-small")
//!     .kind(RequestKind::Embedding)
//!     .text("A rotor assembly comprising a hub and blades.")
//!     .build()?;
//! let response = client.call(&request).await?;
//! println!("{:?}", response.usage());
//! # Ok(())
//! # }
//! ```
//!
//! [`InferenceBackend`]: tollgate_interface::InferenceBackend

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod metrics;
mod openai;
mod token_counting;

pub use metrics::{ApiMetrics, classify_error};
pub use openai::{
    ChatChoice, ChatMessage, ChatRequest, ChatRequestBuilder, ChatRequestBuilderError,
    ChatResponse, EmbeddingData, EmbeddingRequest, EmbeddingRequestBuilder,
    EmbeddingRequestBuilderError, EmbeddingResponse, MAX_RETRY_AFTER, OPENAI_API_URL,
    OpenAIClient, TokenUsage, error_from_status, retry_after,
};
pub use token_counting::{MAX_SEGMENT_TOKENS, TokenCounter};
