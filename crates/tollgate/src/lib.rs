//! Tollgate - rate-governed batch dispatch for LLM APIs
//!
//! Tollgate turns a large, ordered collection of completion and embedding
//! requests into recorded results at the highest throughput the provider's
//! quotas allow. It never exceeds any configured limit, retries what is worth
//! retrying, and resumes an interrupted run without repeating finished work.
//!
//! # Features
//!
//! - **Multi-dimensional quotas**: RPM, TPM, RPD, TPD and specialized units,
//!   enforced together with sliding windows
//! - **Fair admission**: priority tiers, FIFO within a tier, no head-of-line
//!   starvation of large jobs
//! - **Retry with backoff**: exponential backoff with jitter, honoring the
//!   server's `retry-after`
//! - **Resumable checkpoints**: periodic atomic snapshots keyed by stable job
//!   identities
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tollgate::{
//!     BudgetConfig, CheckpointConfig, Dispatcher, DocumentRecord, DocumentSegmenter,
//!     FileSystemCheckpointStore, OpenAIClient, QuotaTracker, RequestKind, ResultCollector,
//!     RetryConfig, DispatchConfig, TokenCounter, tiers::OpenAITier,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = Arc::new(QuotaTracker::from_tier(&OpenAITier::Tier1, &BudgetConfig::default()));
//!     let client = OpenAIClient::new()?.with_quota_tracker(tracker.clone());
//!     let store = FileSystemCheckpointStore::new("run/checkpoint.json")?;
//!     let collector = Arc::new(ResultCollector::open(store, &CheckpointConfig::default()).await?);
//!
//!     let record = DocumentRecord::new("US7654321B2", RequestKind::Embedding, "text-embedding-3-small", "A rotor assembly...");
//!     let jobs = DocumentSegmenter::new(TokenCounter::cl100k()?).jobs(&record)?;
//!
//!     let dispatcher = Dispatcher::new(Arc::new(client), tracker, collector.clone(), &DispatchConfig::default(), &RetryConfig::default())?;
//!     dispatcher.submit_all(collector.untouched(jobs).await);
//!     let summary = dispatcher.drain().await?;
//!     println!("{} succeeded", summary.succeeded());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Tollgate is organized as a workspace with focused crates:
//!
//! - `tollgate_error` - Error types
//! - `tollgate_core` - Jobs, outcomes and settings
//! - `tollgate_interface` - `InferenceBackend` trait definition
//! - `tollgate_rate_limit` - Quota tracking, tiers and configuration
//! - `tollgate_checkpoint` - Result collection and checkpoint stores
//! - `tollgate_models` - OpenAI client and token counting
//! - `tollgate_dispatch` - Admission scheduler, retry controller and workers
//!
//! This crate (`tollgate`) re-exports everything for convenience and adds
//! document ingestion and result export for the `tollgate` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod documents;
mod export;

pub use documents::{DocumentRecord, DocumentSegmenter, parse_documents, read_documents};
pub use export::{ExportRecord, export_successes};

pub use tollgate_checkpoint::*;
pub use tollgate_core::*;
pub use tollgate_dispatch::*;
pub use tollgate_error::*;
pub use tollgate_interface::*;
pub use tollgate_models::*;
pub use tollgate_rate_limit::*;
