//! Quota dimensions and the demand a job places on them.

use std::time::Duration;
use tollgate_core::Job;

/// One minute.
pub const MINUTE: Duration = Duration::from_secs(60);

/// One day.
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// What a dimension counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum QuotaUnit {
    /// One unit per call
    Requests,
    /// Prompt plus completion tokens
    Tokens,
    /// Provider-specific resource (images, audio seconds, ...)
    Units,
}

/// One independently enforced limit: `capacity` units of `unit` per trailing
/// `window`.
///
/// # Examples
///
/// ```
/// use tollgate_rate_limit::{QuotaDimension, QuotaUnit};
///
/// let tpm = QuotaDimension::per_minute("tpm", QuotaUnit::Tokens, 1_000_000);
/// assert_eq!(tpm.window().as_secs(), 60);
/// assert_eq!(*tpm.capacity(), 1_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct QuotaDimension {
    name: String,
    unit: QuotaUnit,
    window: Duration,
    capacity: u64,
}

impl QuotaDimension {
    /// Creates a dimension with an arbitrary window.
    pub fn new(name: impl Into<String>, unit: QuotaUnit, window: Duration, capacity: u64) -> Self {
        Self {
            name: name.into(),
            unit,
            window,
            capacity,
        }
    }

    /// Creates a per-minute dimension.
    pub fn per_minute(name: impl Into<String>, unit: QuotaUnit, capacity: u64) -> Self {
        Self::new(name, unit, MINUTE, capacity)
    }

    /// Creates a per-day dimension.
    pub fn per_day(name: impl Into<String>, unit: QuotaUnit, capacity: u64) -> Self {
        Self::new(name, unit, DAY, capacity)
    }

    pub(crate) fn set_capacity(&mut self, capacity: u64) {
        self.capacity = capacity;
    }
}

/// Resource demand vector of a single call.
///
/// Tokens are an upfront estimate; the tracker is corrected with the true
/// figure after the call through [`QuotaTracker::reconcile`](crate::QuotaTracker::reconcile).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct Demand {
    requests: u64,
    tokens: u64,
    units: u64,
}

impl Demand {
    /// Creates a demand vector.
    pub fn new(requests: u64, tokens: u64, units: u64) -> Self {
        Self {
            requests,
            tokens,
            units,
        }
    }

    /// One request plus the job's estimated tokens and specialized units.
    pub fn for_job(job: &Job) -> Self {
        Self::new(1, job.payload().token_demand(), *job.payload().units())
    }

    /// Amount charged against a dimension of the given unit.
    pub fn amount(&self, unit: QuotaUnit) -> u64 {
        match unit {
            QuotaUnit::Requests => self.requests,
            QuotaUnit::Tokens => self.tokens,
            QuotaUnit::Units => self.units,
        }
    }
}
