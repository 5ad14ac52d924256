//! Result collection and resumable checkpoints for Tollgate.
//!
//! Every terminal job outcome goes through a [`ResultCollector`], which keeps
//! a `JobId → CheckpointEntry` mapping and periodically persists it through a
//! [`CheckpointStore`]. On restart the collector reloads the mapping and
//! [`ResultCollector::pending`] yields only the jobs still to do.
//!
//! # Example
//!
//! ```rust
//! use tollgate_checkpoint::{MemoryCheckpointStore, RecordStatus, ResultCollector};
//! use tollgate_core::{CheckpointConfig, JobId, Outcome, RequestKind, ResponsePayload, Usage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let collector = ResultCollector::open(MemoryCheckpointStore::new(), &CheckpointConfig::default()).await?;
//!
//! let id = JobId::new("US7654321B2", 0, RequestKind::Embedding);
//! let outcome = Outcome::Success {
//!     response: ResponsePayload::Embedding { vector: vec![0.1, 0.2] },
//!     usage: Usage::new(12, 0),
//! };
//!
//! assert_eq!(collector.record(&id, &outcome, 1).await?, RecordStatus::Recorded);
//! assert_eq!(collector.record(&id, &outcome, 1).await?, RecordStatus::Unchanged);
//! collector.snapshot().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod collector;
mod filesystem;
mod record;
mod store;

pub use collector::{Pending, RecordStatus, ResultCollector};
pub use filesystem::FileSystemCheckpointStore;
pub use record::{CHECKPOINT_VERSION, Checkpoint, CheckpointEntry};
pub use store::{CheckpointStore, MemoryCheckpointStore};
pub use tollgate_error::{CheckpointError, CheckpointErrorKind};
