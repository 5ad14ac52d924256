//! Persisted checkpoint document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tollgate_core::{JobId, PermanentReason, ResponsePayload, Usage};

/// Format version written by this build.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Terminal result of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckpointEntry {
    /// The job produced a response
    Succeeded {
        /// Response content
        response: ResponsePayload,
        /// Tokens the provider reported
        usage: Usage,
        /// Attempts made, the successful one included
        attempts: u32,
        /// When the result was recorded
        recorded_at: DateTime<Utc>,
    },
    /// The job was given up on
    Failed {
        /// Failure class
        reason: PermanentReason,
        /// Last error message
        message: String,
        /// Attempts made
        attempts: u32,
        /// When the failure was recorded
        recorded_at: DateTime<Utc>,
    },
}

impl CheckpointEntry {
    /// Whether this entry is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, CheckpointEntry::Succeeded { .. })
    }

    /// Attempts made for the job.
    pub fn attempts(&self) -> u32 {
        match self {
            CheckpointEntry::Succeeded { attempts, .. } | CheckpointEntry::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Mapping from job identity to terminal result.
///
/// Keys are ordered, so two snapshots of the same records serialize to the
/// same bytes apart from `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Checkpoint {
    version: u32,
    updated_at: DateTime<Utc>,
    records: BTreeMap<JobId, CheckpointEntry>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Checkpoint {
    /// An empty checkpoint.
    pub fn new() -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            updated_at: Utc::now(),
            records: BTreeMap::new(),
        }
    }

    /// Entry recorded for `id`.
    pub fn get(&self, id: &JobId) -> Option<&CheckpointEntry> {
        self.records.get(id)
    }

    /// Whether `id` has a recorded success.
    pub fn is_succeeded(&self, id: &JobId) -> bool {
        self.records.get(id).is_some_and(CheckpointEntry::is_success)
    }

    /// Number of recorded successes.
    pub fn succeeded(&self) -> usize {
        self.records.values().filter(|e| e.is_success()).count()
    }

    /// Number of recorded failures.
    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }

    pub(crate) fn insert(&mut self, id: JobId, entry: CheckpointEntry) {
        self.records.insert(id, entry);
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
