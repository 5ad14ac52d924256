//! Run settings for the dispatcher, retry controller and checkpoint store.
//!
//! Each struct deserializes from its own table of `tollgate.toml` and falls
//! back to the defaults below for any missing key.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tollgate_error::ConfigError;

/// Worker pool settings.
///
/// ```toml
/// [dispatch]
/// concurrency = 8
/// call_timeout_secs = 60
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct DispatchConfig {
    /// Maximum number of calls in flight at once
    #[serde(default = "default_concurrency")]
    concurrency: usize,

    /// Upper bound on a single remote call (seconds)
    #[serde(default = "default_call_timeout_secs")]
    call_timeout_secs: u64,

    /// Capacity of the progress event channel
    #[serde(default = "default_progress_buffer")]
    progress_buffer: usize,
}

fn default_concurrency() -> usize {
    4
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_progress_buffer() -> usize {
    256
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            call_timeout_secs: default_call_timeout_secs(),
            progress_buffer: default_progress_buffer(),
        }
    }
}

impl DispatchConfig {
    /// Call timeout as a `Duration`.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Rejects settings that cannot make progress.
    ///
    /// # Errors
    ///
    /// Returns an error if concurrency or the call timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::new("dispatch.concurrency must be at least 1"));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::new(
                "dispatch.call_timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Retry controller settings.
///
/// `max_attempts` counts every attempt, the first one included.
///
/// # Examples
///
/// ```
/// use tollgate_core::RetryConfig;
///
/// let retry = RetryConfig::default().with_max_attempts(3);
/// assert_eq!(*retry.max_attempts(), 3);
/// assert_eq!(retry.base_delay().as_millis(), 2000);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct RetryConfig {
    /// Attempts before a recoverable failure is abandoned
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,

    /// First backoff delay (milliseconds), doubled per attempt
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,

    /// Cap on any single backoff delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    max_delay_ms: u64,

    /// Whether to randomize delays
    #[serde(default = "default_jitter")]
    jitter: bool,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// First backoff delay.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff cap.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Rejects settings that cannot make progress.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero or the base delay exceeds
    /// the cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::new("retry.max_attempts must be at least 1"));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::new(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Checkpoint cadence and location.
///
/// A snapshot is written after `every_completions` new records or
/// `every_secs` seconds, whichever comes first, and always at the end of a
/// run.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct CheckpointConfig {
    /// Snapshot file
    #[serde(default = "default_checkpoint_path")]
    path: PathBuf,

    /// New records between snapshots
    #[serde(default = "default_every_completions")]
    every_completions: usize,

    /// Seconds between snapshots
    #[serde(default = "default_every_secs")]
    every_secs: u64,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("tollgate-checkpoint.json")
}

fn default_every_completions() -> usize {
    50
}

fn default_every_secs() -> u64 {
    30
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
            every_completions: default_every_completions(),
            every_secs: default_every_secs(),
        }
    }
}

impl CheckpointConfig {
    /// Snapshot interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.every_secs)
    }
}
