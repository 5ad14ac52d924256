//! Core data types for Tollgate.
//!
//! This crate provides the job, outcome and settings types shared by the
//! quota tracker, the dispatcher and the checkpoint store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod budget;
mod job;
mod outcome;
mod settings;
mod telemetry;

pub use budget::{BudgetConfig, BudgetConfigBuilder};
pub use job::{
    Job, JobId, JobPayload, JobPayloadBuilder, JobPayloadBuilderError, JobState, Priority,
    RequestKind,
};
pub use outcome::{Outcome, PermanentReason, RecoverableReason, ResponsePayload, Usage};
pub use settings::{CheckpointConfig, DispatchConfig, RetryConfig};
pub use telemetry::{TracingConfig, init_tracing};
