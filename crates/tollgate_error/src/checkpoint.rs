//! Checkpoint storage error types.

/// Kinds of checkpoint errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CheckpointErrorKind {
    /// Failed to create the checkpoint directory
    #[display("Failed to create checkpoint directory: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write the snapshot
    #[display("Failed to write checkpoint: {}", _0)]
    FileWrite(String),
    /// Failed to read a prior snapshot
    #[display("Failed to read checkpoint: {}", _0)]
    FileRead(String),
    /// Snapshot could not be encoded or decoded
    #[display("Malformed checkpoint: {}", _0)]
    Malformed(String),
    /// Snapshot was written by an incompatible format version
    #[display("Unsupported checkpoint version {} (expected {})", found, expected)]
    UnsupportedVersion {
        /// Version found on disk
        found: u32,
        /// Version this build writes
        expected: u32,
    },
}

/// Checkpoint error with location tracking.
///
/// A checkpoint error during a run is fatal: the dispatcher stops rather than
/// keep producing results it cannot persist.
///
/// # Examples
///
/// ```
/// use tollgate_error::{CheckpointError, CheckpointErrorKind};
///
/// let err = CheckpointError::new(CheckpointErrorKind::FileWrite("disk full".to_string()));
/// assert!(format!("{}", err).contains("disk full"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Checkpoint Error: {} at line {} in {}", kind, line, file)]
pub struct CheckpointError {
    /// The kind of error that occurred
    pub kind: CheckpointErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CheckpointError {
    /// Create a new checkpoint error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CheckpointErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
