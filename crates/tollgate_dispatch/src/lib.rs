//! Rate-governed batch dispatch for Tollgate.
//!
//! This crate turns a stream of [`Job`](tollgate_core::Job)s into recorded
//! outcomes:
//!
//! - [`AdmissionScheduler`] orders jobs by priority and submission sequence
//!   and admits the head job once the [`QuotaTracker`](tollgate_rate_limit::QuotaTracker)
//!   grants its demand.
//! - [`Dispatcher`] runs a fixed pool of workers that call the
//!   [`InferenceBackend`](tollgate_interface::InferenceBackend) under a
//!   timeout.
//! - [`RetryController`] classifies each result and decides between
//!   recording it and re-queueing it after a backoff.
//!
//! Terminal outcomes go to a [`ResultCollector`](tollgate_checkpoint::ResultCollector),
//! so an interrupted run resumes where it stopped.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;
mod metrics;
mod progress;
mod retry;
mod scheduler;

pub use dispatcher::Dispatcher;
pub use metrics::DispatchMetrics;
pub use progress::{CancelHandle, ProgressEvent, RunSummary};
pub use retry::{Decision, RetryController};
pub use scheduler::{AdmissionScheduler, Admitted};
