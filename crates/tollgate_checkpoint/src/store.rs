//! Checkpoint persistence backends.

use crate::Checkpoint;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tollgate_error::CheckpointError;

/// Trait for pluggable checkpoint persistence.
///
/// Implementations must replace the stored snapshot atomically: a reader
/// sees either the previous snapshot or the new one, never a mix.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the most recent snapshot, or `None` if nothing was persisted yet.
    async fn load(&self) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Replace the stored snapshot.
    async fn persist(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// In-process store, for tests and dry runs.
///
/// Clones share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    latest: Arc<Mutex<Option<Checkpoint>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryCheckpointStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `checkpoint`, as if left by a prior run.
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            latest: Arc::new(Mutex::new(Some(checkpoint))),
            writes: Arc::default(),
        }
    }

    /// The last persisted snapshot.
    pub fn latest(&self) -> Option<Checkpoint> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful `persist` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.latest())
    }

    async fn persist(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(checkpoint.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
