//! Error types for quota tracking.

/// Error kinds for quota tracking operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RateLimitErrorKind {
    /// A single demand is larger than a dimension's whole capacity
    #[display(
        "Demand of {} exceeds capacity {} of dimension '{}'",
        demand,
        capacity,
        dimension
    )]
    DemandExceedsCapacity {
        /// Dimension name
        dimension: String,
        /// Units requested
        demand: u64,
        /// Units the window can ever hold
        capacity: u64,
    },
    /// No dimension with this name is tracked
    #[display("Unknown quota dimension: {}", _0)]
    UnknownDimension(String),
    /// Unknown or malformed tier
    #[display("Invalid tier: {}", _0)]
    InvalidTier(String),
}

/// Quota tracking error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Rate Limit Error: {} at line {} in {}", kind, line, file)]
pub struct RateLimitError {
    kind: RateLimitErrorKind,
    line: u32,
    file: &'static str,
}

impl RateLimitError {
    /// Create a new rate limiting error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RateLimitErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RateLimitErrorKind {
        &self.kind
    }
}
