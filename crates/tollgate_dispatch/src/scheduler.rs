//! Admission scheduler: the queue between job submission and the workers.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::time::Instant;
use tollgate_core::{Job, JobState, Priority};
use tollgate_error::RateLimitError;
use tollgate_rate_limit::{Admission, Demand, QuotaTracker, Reservation};
use tracing::{debug, trace};

type QueueKey = (Reverse<Priority>, u64);

/// A job leaving the scheduler.
#[derive(Debug)]
pub enum Admitted {
    /// Quota was reserved; the job may be sent.
    Granted {
        /// The admitted job
        job: Job,
        /// Submission sequence number
        seq: u64,
        /// Quota held by the call
        reservation: Reservation,
    },
    /// The job's demand can never fit a configured dimension.
    Rejected {
        /// The rejected job
        job: Job,
        /// Submission sequence number
        seq: u64,
        /// Why the tracker refused it
        error: RateLimitError,
    },
}

#[derive(Debug, Default)]
struct Queue {
    jobs: BTreeMap<QueueKey, Job>,
    closed: bool,
}

/// Orders pending jobs and admits them against a [`QuotaTracker`].
///
/// Jobs are served highest priority first and FIFO by submission sequence
/// within a priority. Only the job at the head of the queue ever asks the
/// tracker for quota, so a large job cannot be starved by smaller ones
/// behind it.
#[derive(Debug)]
pub struct AdmissionScheduler {
    tracker: Arc<QuotaTracker>,
    queue: Mutex<Queue>,
    changed: Notify,
}

impl AdmissionScheduler {
    /// Creates an empty scheduler admitting against `tracker`.
    pub fn new(tracker: Arc<QuotaTracker>) -> Self {
        Self {
            tracker,
            queue: Mutex::new(Queue::default()),
            changed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Quota tracker the scheduler admits against.
    pub fn tracker(&self) -> &Arc<QuotaTracker> {
        &self.tracker
    }

    /// Enqueues a job under its submission sequence number.
    ///
    /// A retried job is pushed again with its original sequence number and
    /// so keeps its place in line.
    pub fn push(&self, mut job: Job, seq: u64) {
        job.set_state(JobState::Pending);
        let key = (Reverse(*job.priority()), seq);
        trace!(job_id = %job.id(), seq, "Queued job");
        self.lock().jobs.insert(key, job);
        self.changed.notify_waiters();
    }

    /// Number of jobs waiting for admission.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Whether no job is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    /// Stops [`next_admitted`](Self::next_admitted) from waiting once the
    /// queue is empty.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_waiters();
    }

    /// Wakes waiters so they re-check the tracker, e.g. after reconciliation
    /// returned tokens or capacities changed.
    pub fn poke(&self) {
        self.changed.notify_waiters();
    }

    /// Waits for the head job to be admitted.
    ///
    /// Returns `None` once the scheduler is closed and empty. While the head
    /// job is denied, the caller sleeps until the tracker's `wait_until` or
    /// the next state change, whichever is first, without holding any lock.
    ///
    /// Cancel safe: the queue and the tracker are only modified in the same
    /// synchronous step that produces the return value.
    pub async fn next_admitted(&self) -> Option<Admitted> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wait_until = match self.try_admit() {
                Attempt::Ready(admitted) => return Some(admitted),
                Attempt::Closed => return None,
                Attempt::Wait(wait_until) => wait_until,
            };

            match wait_until {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = &mut notified => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    fn try_admit(&self) -> Attempt {
        let mut queue = self.lock();
        let Some((&key, head)) = queue.jobs.first_key_value() else {
            return if queue.closed {
                Attempt::Closed
            } else {
                Attempt::Wait(None)
            };
        };

        match self.tracker.reserve(&Demand::for_job(head)) {
            Ok(Admission::Granted(reservation)) => {
                let Some(mut job) = queue.jobs.remove(&key) else {
                    return Attempt::Wait(None);
                };
                drop(queue);
                job.set_state(JobState::Admitted);
                debug!(job_id = %job.id(), seq = key.1, "Admitted job");
                // The next job is now at the head.
                self.changed.notify_waiters();
                Attempt::Ready(Admitted::Granted {
                    job,
                    seq: key.1,
                    reservation,
                })
            }
            Ok(Admission::Denied { wait_until }) => {
                trace!(job_id = %head.id(), ?wait_until, "Head job waiting for quota");
                Attempt::Wait(Some(wait_until))
            }
            Err(error) => {
                let Some(job) = queue.jobs.remove(&key) else {
                    return Attempt::Wait(None);
                };
                drop(queue);
                debug!(job_id = %job.id(), %error, "Job can never be admitted");
                self.changed.notify_waiters();
                Attempt::Ready(Admitted::Rejected {
                    job,
                    seq: key.1,
                    error,
                })
            }
        }
    }
}

enum Attempt {
    Ready(Admitted),
    Closed,
    Wait(Option<Instant>),
}
