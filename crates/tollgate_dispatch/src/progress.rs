//! Progress reporting and run control.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tollgate_core::JobId;

/// Emitted once per job reaching a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct ProgressEvent {
    /// The job that finished
    job_id: JobId,
    /// Whether it succeeded
    success: bool,
    /// Attempts it took
    attempts: u32,
    /// Terminal jobs so far in this run
    completed: u64,
    /// Successes so far
    succeeded: u64,
    /// Failures so far
    failed: u64,
    /// Time since the dispatcher started
    elapsed: Duration,
    /// Tokens consumed by successful calls so far
    cumulative_tokens: u64,
}

impl ProgressEvent {
    pub(crate) fn new(
        job_id: JobId,
        success: bool,
        attempts: u32,
        counters: &RunCounters,
        elapsed: Duration,
    ) -> Self {
        Self {
            job_id,
            success,
            attempts,
            completed: counters.succeeded + counters.failed,
            succeeded: counters.succeeded,
            failed: counters.failed,
            elapsed,
            cumulative_tokens: counters.tokens,
        }
    }

    /// Terminal jobs per second of elapsed time.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.completed as f64 / secs
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunCounters {
    pub(crate) submitted: u64,
    pub(crate) succeeded: u64,
    pub(crate) failed: u64,
    pub(crate) calls: u64,
    pub(crate) retries: u64,
    pub(crate) tokens: u64,
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct RunSummary {
    /// Jobs handed to the dispatcher
    submitted: u64,
    /// Jobs recorded as succeeded
    succeeded: u64,
    /// Jobs recorded as failed
    failed: u64,
    /// Jobs left unrecorded because the run was cancelled
    unfinished: u64,
    /// Remote calls made, retries included
    calls: u64,
    /// Attempts re-queued after recoverable failures
    retries: u64,
    /// Tokens consumed by successful calls
    tokens: u64,
    /// Whether the run was cancelled
    cancelled: bool,
    /// Wall time of the run
    elapsed: Duration,
}

impl RunSummary {
    pub(crate) fn new(counters: &RunCounters, cancelled: bool, elapsed: Duration) -> Self {
        let terminal = counters.succeeded + counters.failed;
        Self {
            submitted: counters.submitted,
            succeeded: counters.succeeded,
            failed: counters.failed,
            unfinished: counters.submitted.saturating_sub(terminal),
            calls: counters.calls,
            retries: counters.retries,
            tokens: counters.tokens,
            cancelled,
            elapsed,
        }
    }
}

/// Stops a running dispatcher.
///
/// Cancelling stops admission of new jobs. Calls already in flight finish
/// (or time out) and are recorded; everything else is left unrecorded and
/// shows up as pending on the next run.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Resolves once `receiver` reports cancellation.
pub(crate) async fn cancelled(receiver: &mut watch::Receiver<bool>) {
    // A dropped sender cannot cancel any more; park instead of spinning.
    if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
