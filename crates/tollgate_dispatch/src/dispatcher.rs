//! Worker pool driving admitted jobs through the remote backend.

use crate::progress::{RunCounters, cancelled};
use crate::{
    AdmissionScheduler, Admitted, CancelHandle, Decision, DispatchMetrics, ProgressEvent,
    RetryController, RunSummary,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tollgate_checkpoint::ResultCollector;
use tollgate_core::{
    DispatchConfig, Job, JobState, Outcome, PermanentReason, RecoverableReason, RetryConfig,
};
use tollgate_error::{
    ApiError, ApiErrorKind, CheckpointError, DispatchError, DispatchErrorKind, RateLimitError,
    TollgateResult,
};
use tollgate_interface::{ApiRequest, InferenceBackend};
use tollgate_rate_limit::{QuotaTracker, Reservation};
use tracing::{debug, error, info, instrument, warn};

/// Runs jobs against a backend under quota, concurrency and retry control.
///
/// `concurrency` workers each loop: wait for the scheduler to admit the head
/// job, call the backend under the configured timeout, then either record
/// the outcome or schedule a retry. Quota and the worker count are separate
/// gates; a job needs both.
///
/// Must be created inside a Tokio runtime.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new(backend, tracker, collector, &dispatch, &retry)?;
/// let mut progress = dispatcher.subscribe();
/// dispatcher.submit_all(jobs);
/// let summary = dispatcher.drain().await?;
/// ```
pub struct Dispatcher {
    shared: Arc<Shared>,
    workers: JoinSet<()>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.workers.len())
            .field("queued", &self.shared.scheduler.len())
            .field("outstanding", &self.shared.outstanding.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

struct Shared {
    backend: Arc<dyn InferenceBackend>,
    scheduler: AdmissionScheduler,
    retry: RetryController,
    collector: Arc<ResultCollector>,
    call_timeout: Duration,
    cancel: CancelHandle,
    progress: broadcast::Sender<ProgressEvent>,
    counters: Mutex<RunCounters>,
    next_seq: AtomicU64,
    outstanding: AtomicU64,
    idle: Notify,
    fatal: Mutex<Option<CheckpointError>>,
    started: Instant,
}

impl Dispatcher {
    /// Starts the worker pool.
    ///
    /// # Errors
    ///
    /// Returns error if either configuration cannot make progress.
    #[instrument(skip_all, fields(provider = backend.provider_name(), concurrency = config.concurrency()))]
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        tracker: Arc<QuotaTracker>,
        collector: Arc<ResultCollector>,
        config: &DispatchConfig,
        retry: &RetryConfig,
    ) -> Result<Self, DispatchError> {
        config
            .validate()
            .and_then(|_| retry.validate())
            .map_err(|e| DispatchError::new(DispatchErrorKind::InvalidConfig(e.message)))?;

        let (progress, _) = broadcast::channel((*config.progress_buffer()).max(1));
        let shared = Arc::new(Shared {
            backend,
            scheduler: AdmissionScheduler::new(tracker),
            retry: RetryController::new(retry.clone()),
            collector,
            call_timeout: config.call_timeout(),
            cancel: CancelHandle::new(),
            progress,
            counters: Mutex::new(RunCounters::default()),
            next_seq: AtomicU64::new(0),
            outstanding: AtomicU64::new(0),
            idle: Notify::new(),
            fatal: Mutex::new(None),
            started: Instant::now(),
        });

        let mut workers = JoinSet::new();
        for worker in 0..*config.concurrency() {
            workers.spawn(run_worker(Arc::clone(&shared), worker));
        }
        debug!(workers = workers.len(), "Started dispatcher");

        Ok(Self { shared, workers })
    }

    /// Enqueues a job and returns its submission sequence number.
    ///
    /// Never blocks; admission happens on the workers.
    pub fn submit(&self, job: Job) -> u64 {
        let seq = self.shared.next_seq.fetch_add(1, Ordering::SeqCst);
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        self.shared.counters().submitted += 1;
        self.shared.scheduler.push(job, seq);
        seq
    }

    /// Enqueues every job in order and returns how many were submitted.
    pub fn submit_all<I>(&self, jobs: I) -> usize
    where
        I: IntoIterator<Item = Job>,
    {
        jobs.into_iter().map(|job| self.submit(job)).count()
    }

    /// Handle that cancels this run.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.shared.cancel.clone()
    }

    /// Receives one [`ProgressEvent`] per terminal job.
    ///
    /// A slow receiver that falls more than `progress_buffer` events behind
    /// skips ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.shared.progress.subscribe()
    }

    /// Quota tracker shared by the workers.
    pub fn tracker(&self) -> &Arc<QuotaTracker> {
        self.shared.scheduler.tracker()
    }

    /// Collector receiving terminal outcomes.
    pub fn collector(&self) -> &Arc<ResultCollector> {
        &self.shared.collector
    }

    /// Waits until every submitted job is terminal or the run is cancelled,
    /// then stops the workers and flushes the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns the checkpoint error that aborted the run, an error from the
    /// final snapshot, or [`DispatchErrorKind::WorkerFailed`] if a worker
    /// panicked.
    #[instrument(skip(self))]
    pub async fn drain(mut self) -> TollgateResult<RunSummary> {
        let mut cancel = self.shared.cancel.subscribe();
        let mut worker_failure = None;
        loop {
            let idle = self.shared.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self.shared.outstanding.load(Ordering::SeqCst) == 0
                || self.shared.cancel.is_cancelled()
            {
                break;
            }

            // A dead worker leaves its job outstanding forever.
            tokio::select! {
                _ = &mut idle => {}
                _ = cancelled(&mut cancel) => {}
                Some(joined) = self.workers.join_next() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Worker task failed, cancelling run");
                        worker_failure = Some(e.to_string());
                        self.shared.cancel.cancel();
                    }
                }
            }
        }

        self.shared.scheduler.close();
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task failed");
                worker_failure.get_or_insert_with(|| e.to_string());
            }
        }

        if let Some(error) = self.shared.take_fatal() {
            return Err(error.into());
        }
        self.shared.collector.snapshot().await?;
        if let Some(message) = worker_failure {
            return Err(DispatchError::new(DispatchErrorKind::WorkerFailed(message)).into());
        }

        let summary = RunSummary::new(
            &self.shared.counters(),
            self.shared.cancel.is_cancelled(),
            self.shared.started.elapsed(),
        );
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            unfinished = summary.unfinished(),
            calls = summary.calls(),
            tokens = summary.tokens(),
            cancelled = summary.cancelled(),
            "Run finished"
        );
        Ok(summary)
    }
}

async fn run_worker(shared: Arc<Shared>, worker: usize) {
    let mut cancel = shared.cancel.subscribe();
    loop {
        let admitted = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break,
            admitted = shared.scheduler.next_admitted() => admitted,
        };

        match admitted {
            Some(Admitted::Granted {
                job,
                seq,
                reservation,
            }) => shared.execute(job, seq, reservation).await,
            Some(Admitted::Rejected { job, error, .. }) => shared.reject(job, error).await,
            None => break,
        }
    }
    debug!(worker, "Worker stopped");
}

impl Shared {
    fn counters(&self) -> MutexGuard<'_, RunCounters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_fatal(&self) -> Option<CheckpointError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    #[instrument(skip_all, fields(job_id = %job.id(), seq = seq))]
    async fn execute(self: &Arc<Self>, mut job: Job, seq: u64, reservation: Reservation) {
        let attempt = job.begin_attempt();
        let kind = job.kind();
        let metrics = DispatchMetrics::get();

        let request = ApiRequest::for_job(&job);
        let started = Instant::now();
        let result = match tokio::time::timeout(self.call_timeout, self.backend.call(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(ApiError::new(ApiErrorKind::Timeout(self.call_timeout))),
        };
        metrics.record_call(kind.as_ref(), started.elapsed().as_secs_f64());
        self.counters().calls += 1;

        let outcome = RetryController::outcome_of(result);
        let decision = self.retry.classify(&outcome, attempt);
        let tracker = self.scheduler.tracker();

        match &outcome {
            Outcome::Success { usage, .. } => {
                tracker.reconcile(&reservation, *usage.total_tokens());
                self.scheduler.poke();
            }
            Outcome::Recoverable {
                reason: RecoverableReason::RateLimited,
                retry_after,
                ..
            } => {
                let pause = match (retry_after, decision) {
                    (Some(hint), _) => Some(*hint),
                    (None, Decision::RetryAfter(delay)) => Some(delay),
                    (None, _) => None,
                };
                if let Some(pause) = pause {
                    debug!(pause_ms = pause.as_millis() as u64, "Server rate limit, throttling admission");
                    tracker.throttle(pause);
                    metrics.record_throttle(kind.as_ref());
                }
            }
            _ => {}
        }

        match decision {
            Decision::RetryAfter(delay) => self.schedule_retry(job, seq, delay, &outcome),
            Decision::Success | Decision::Abandon => self.finish(job, &outcome).await,
        }
    }

    async fn reject(&self, job: Job, error: RateLimitError) {
        let outcome = Outcome::Permanent {
            reason: PermanentReason::InvalidRequest,
            message: error.to_string(),
        };
        self.finish(job, &outcome).await;
    }

    fn schedule_retry(self: &Arc<Self>, mut job: Job, seq: u64, delay: Duration, outcome: &Outcome) {
        job.set_state(JobState::AwaitingRetry);
        let reason = match outcome {
            Outcome::Recoverable { reason, message, .. } => {
                warn!(
                    job_id = %job.id(),
                    attempt = job.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    %reason,
                    %message,
                    "Retrying job"
                );
                reason.to_string()
            }
            _ => "unknown".to_string(),
        };
        self.counters().retries += 1;
        DispatchMetrics::get().record_retry(job.kind().as_ref(), &reason);

        let shared = Arc::clone(self);
        let mut cancel = self.cancel.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => {
                    debug!(job_id = %job.id(), "Dropped pending retry of cancelled run");
                }
                _ = tokio::time::sleep(delay) => shared.scheduler.push(job, seq),
            }
        });
    }

    async fn finish(&self, mut job: Job, outcome: &Outcome) {
        let success = outcome.is_success();
        job.set_state(if success {
            JobState::Succeeded
        } else {
            JobState::Failed
        });
        let attempts = *job.attempts();

        if let Err(error) = self.collector.record(job.id(), outcome, attempts).await {
            self.abort(error);
        }

        let event = {
            let mut counters = self.counters();
            if success {
                counters.succeeded += 1;
            } else {
                counters.failed += 1;
            }
            if let Outcome::Success { usage, .. } = outcome {
                counters.tokens += usage.total_tokens();
            }
            ProgressEvent::new(
                job.id().clone(),
                success,
                attempts,
                &counters,
                self.started.elapsed(),
            )
        };

        let reason = failure_reason(outcome);
        match (outcome, reason) {
            (Outcome::Permanent { message, .. } | Outcome::Recoverable { message, .. }, Some(reason)) => {
                error!(job_id = %job.id(), attempts, reason, %message, "Job failed");
            }
            _ => info!(
                job_id = %job.id(),
                attempts,
                completed = event.completed(),
                tokens = event.cumulative_tokens(),
                "Job succeeded"
            ),
        }
        DispatchMetrics::get().record_terminal(job.kind().as_ref(), success, reason);

        // No receivers is fine.
        let _ = self.progress.send(event);

        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn abort(&self, error: CheckpointError) {
        error!(%error, "Checkpoint write failed, cancelling run");
        let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if fatal.is_none() {
            *fatal = Some(error);
        }
        drop(fatal);
        self.cancel.cancel();
    }
}

fn failure_reason(outcome: &Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Success { .. } => None,
        Outcome::Recoverable { .. } => Some("retries_exhausted"),
        Outcome::Permanent { reason, .. } => Some(match reason {
            PermanentReason::InvalidRequest => "invalid_request",
            PermanentReason::Authentication => "authentication",
            PermanentReason::ContentPolicy => "content_policy",
            PermanentReason::RetriesExhausted => "retries_exhausted",
        }),
    }
}
