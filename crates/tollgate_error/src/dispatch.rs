//! Dispatcher error types.

/// Conditions that stop a dispatch run as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DispatchErrorKind {
    /// A worker task panicked or was aborted
    #[display("Worker task failed: {}", _0)]
    WorkerFailed(String),
    /// The run was configured in a way that cannot make progress
    #[display("Invalid dispatch configuration: {}", _0)]
    InvalidConfig(String),
}

/// Dispatch error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Dispatch Error: {} at line {} in {}", kind, line, file)]
pub struct DispatchError {
    /// The kind of error that occurred
    pub kind: DispatchErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl DispatchError {
    /// Create a new dispatch error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DispatchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
