//! Result collection with periodic snapshots.

use crate::{Checkpoint, CheckpointEntry, CheckpointStore};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tollgate_core::{CheckpointConfig, Job, JobId, Outcome, PermanentReason, ResponsePayload};
use tollgate_error::CheckpointError;
use tracing::{debug, info, instrument};

/// What [`ResultCollector::record`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RecordStatus {
    /// The entry was written
    Recorded,
    /// The same success was already on record
    Unchanged,
    /// A failure arrived for a job that already succeeded; the success stays
    Rejected,
}

#[derive(Debug)]
struct CollectorState {
    checkpoint: Checkpoint,
    unsaved: usize,
    last_snapshot: Instant,
}

/// Accumulates terminal outcomes and persists them through a
/// [`CheckpointStore`].
///
/// A snapshot is written once `every_completions` new entries are pending or
/// `every_secs` have passed since the last one, whichever comes first. All
/// writes happen under the collector's lock, so snapshots never interleave.
pub struct ResultCollector {
    store: Box<dyn CheckpointStore>,
    every_completions: usize,
    interval: Duration,
    state: Mutex<CollectorState>,
}

impl std::fmt::Debug for ResultCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCollector")
            .field("every_completions", &self.every_completions)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl ResultCollector {
    /// Opens a collector, resuming from the store's last snapshot if any.
    ///
    /// # Errors
    ///
    /// Returns error if a prior snapshot exists but cannot be read.
    #[instrument(skip_all)]
    pub async fn open<S>(store: S, config: &CheckpointConfig) -> Result<Self, CheckpointError>
    where
        S: CheckpointStore + 'static,
    {
        let checkpoint = store.load().await?.unwrap_or_default();
        debug!(
            records = checkpoint.records().len(),
            "Opened result collector"
        );

        Ok(Self {
            store: Box::new(store),
            every_completions: (*config.every_completions()).max(1),
            interval: config.interval(),
            state: Mutex::new(CollectorState {
                checkpoint,
                unsaved: 0,
                last_snapshot: Instant::now(),
            }),
        })
    }

    /// Records the terminal outcome of a job.
    ///
    /// A recorded success is never replaced. A recoverable outcome handed to
    /// the collector is recorded as [`PermanentReason::RetriesExhausted`].
    ///
    /// # Errors
    ///
    /// Returns error if a due snapshot fails to persist. The entry itself is
    /// kept in memory.
    #[instrument(skip(self, outcome), fields(job_id = %id))]
    pub async fn record(
        &self,
        id: &JobId,
        outcome: &Outcome,
        attempts: u32,
    ) -> Result<RecordStatus, CheckpointError> {
        let mut state = self.state.lock().await;

        let previous_success = state.checkpoint.is_succeeded(id);
        let status = match outcome {
            Outcome::Success { .. } if previous_success => RecordStatus::Unchanged,
            _ if previous_success => RecordStatus::Rejected,
            _ => {
                state
                    .checkpoint
                    .insert(id.clone(), entry_for(outcome, attempts));
                RecordStatus::Recorded
            }
        };
        debug!(%status, attempts, "Recorded outcome");

        if status == RecordStatus::Recorded {
            state.unsaved += 1;
            let due = state.unsaved >= self.every_completions
                || state.last_snapshot.elapsed() >= self.interval;
            if due {
                self.persist_locked(&mut state).await?;
            }
        }

        Ok(status)
    }

    /// Persists the current mapping now.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn snapshot(&self) -> Result<(), CheckpointError> {
        let mut state = self.state.lock().await;
        self.persist_locked(&mut state).await
    }

    async fn persist_locked(&self, state: &mut CollectorState) -> Result<(), CheckpointError> {
        state.checkpoint.touch();
        self.store.persist(&state.checkpoint).await?;
        info!(
            records = state.checkpoint.records().len(),
            succeeded = state.checkpoint.succeeded(),
            failed = state.checkpoint.failed(),
            "Checkpoint saved"
        );
        state.unsaved = 0;
        state.last_snapshot = Instant::now();
        Ok(())
    }

    /// Jobs without a recorded success, in their original order.
    ///
    /// Failed jobs are included, so this is the set for an explicit re-run.
    pub async fn pending<I>(&self, jobs: I) -> Pending<I::IntoIter>
    where
        I: IntoIterator<Item = Job>,
    {
        let state = self.state.lock().await;
        let skip = state
            .checkpoint
            .records()
            .iter()
            .filter(|(_, entry)| entry.is_success())
            .map(|(id, _)| id.clone())
            .collect();
        Pending {
            jobs: jobs.into_iter(),
            skip,
        }
    }

    /// Jobs with no record at all, in their original order.
    pub async fn untouched<I>(&self, jobs: I) -> Pending<I::IntoIter>
    where
        I: IntoIterator<Item = Job>,
    {
        let state = self.state.lock().await;
        let skip = state.checkpoint.records().keys().cloned().collect();
        Pending {
            jobs: jobs.into_iter(),
            skip,
        }
    }

    /// Final mapping from job identity to response, for downstream joins.
    pub async fn successes(&self) -> BTreeMap<JobId, ResponsePayload> {
        let state = self.state.lock().await;
        state
            .checkpoint
            .records()
            .iter()
            .filter_map(|(id, entry)| match entry {
                CheckpointEntry::Succeeded { response, .. } => Some((id.clone(), response.clone())),
                CheckpointEntry::Failed { .. } => None,
            })
            .collect()
    }

    /// Copy of every recorded entry.
    pub async fn checkpoint(&self) -> Checkpoint {
        self.state.lock().await.checkpoint.clone()
    }
}

fn entry_for(outcome: &Outcome, attempts: u32) -> CheckpointEntry {
    let recorded_at = Utc::now();
    match outcome {
        Outcome::Success { response, usage } => CheckpointEntry::Succeeded {
            response: response.clone(),
            usage: *usage,
            attempts,
            recorded_at,
        },
        Outcome::Permanent { reason, message } => CheckpointEntry::Failed {
            reason: *reason,
            message: message.clone(),
            attempts,
            recorded_at,
        },
        Outcome::Recoverable { message, .. } => CheckpointEntry::Failed {
            reason: PermanentReason::RetriesExhausted,
            message: message.clone(),
            attempts,
            recorded_at,
        },
    }
}

/// Lazy filter over a job sequence; see [`ResultCollector::pending`].
#[derive(Debug)]
pub struct Pending<I> {
    jobs: I,
    skip: HashSet<JobId>,
}

impl<I> Iterator for Pending<I>
where
    I: Iterator<Item = Job>,
{
    type Item = Job;

    fn next(&mut self) -> Option<Job> {
        let skip = &self.skip;
        self.jobs.find(|job| !skip.contains(job.id()))
    }
}
