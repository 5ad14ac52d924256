//! Job identity, payload and lifecycle types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tollgate_error::{BuilderError, BuilderErrorKind};

/// What a job asks the remote API to produce.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestKind {
    /// Chat-style completion
    Completion,
    /// Vector embedding
    Embedding,
}

/// Admission tier. Jobs are admitted FIFO within a tier; a higher tier is
/// always served before a lower one.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    /// Served after everything else
    Low,
    /// Default tier
    #[default]
    Normal,
    /// Served first
    High,
}

/// Stable identity of a job.
///
/// Derived only from the source document, the chunk index and the request
/// kind, so the same input always maps to the same key across runs. The
/// string form is `"{kind}:{document_id}:{chunk_index}"`; document ids may
/// themselves contain colons.
///
/// # Examples
///
/// ```
/// use tollgate_core::{JobId, RequestKind};
///
/// let id = JobId::new("US7654321B2", 3, RequestKind::Embedding);
/// assert_eq!(id.to_string(), "embedding:US7654321B2:3");
/// assert_eq!("embedding:US7654321B2:3".parse::<JobId>().unwrap(), id);
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_getters::Getters,
)]
#[serde(try_from = "String", into = "String")]
pub struct JobId {
    kind: RequestKind,
    document_id: String,
    chunk_index: u32,
}

impl JobId {
    /// Creates the identity for one chunk of one document.
    pub fn new(document_id: impl Into<String>, chunk_index: u32, kind: RequestKind) -> Self {
        Self {
            kind,
            document_id: document_id.into(),
            chunk_index,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.document_id, self.chunk_index)
    }
}

impl FromStr for JobId {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            BuilderError::new(BuilderErrorKind::InvalidField {
                field: "job_id".to_string(),
                reason: format!("{}: '{}'", reason, s),
            })
        };

        let (kind, rest) = s.split_once(':').ok_or_else(|| invalid("missing kind"))?;
        let (document_id, chunk) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing chunk index"))?;
        let kind = kind
            .parse::<RequestKind>()
            .map_err(|_| invalid("unknown request kind"))?;
        let chunk_index = chunk
            .parse::<u32>()
            .map_err(|_| invalid("chunk index is not a number"))?;
        if document_id.is_empty() {
            return Err(invalid("empty document id"));
        }

        Ok(Self::new(document_id, chunk_index, kind))
    }
}

impl TryFrom<String> for JobId {
    type Error = BuilderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.to_string()
    }
}

/// The request content of a job.
///
/// # Examples
///
/// ```
/// use tollgate_core::JobPayload;
///
/// let payload = JobPayload::builder()
///     .model("text-embedding-3-small")
///     .text("A rotor assembly comprising...")
///     .estimated_tokens(412u64)
///     .build()
///     .unwrap();
///
/// assert_eq!(*payload.estimated_tokens(), 412);
/// assert!(payload.system_prompt().is_none());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct JobPayload {
    /// Model identifier
    model: String,
    /// Input text (one pre-segmented chunk)
    text: String,
    /// System prompt for completions
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    system_prompt: Option<String>,
    /// Upper bound on generated tokens
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    max_tokens: Option<u32>,
    /// Token usage estimated before the call
    estimated_tokens: u64,
    /// Specialized resource units consumed (images, audio seconds, ...)
    #[builder(default)]
    #[serde(default)]
    units: u64,
}

impl JobPayload {
    /// Creates a new payload builder.
    pub fn builder() -> JobPayloadBuilder {
        JobPayloadBuilder::default()
    }

    /// Tokens this job is expected to consume, including the completion
    /// budget when one is set.
    pub fn token_demand(&self) -> u64 {
        self.estimated_tokens + self.max_tokens.map(u64::from).unwrap_or(0)
    }
}

/// Where a job is in its lifecycle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    /// Waiting for admission
    #[default]
    Pending,
    /// Quota reserved, not yet sent
    Admitted,
    /// Remote call outstanding
    InFlight,
    /// Backing off after a recoverable failure
    AwaitingRetry,
    /// Terminal: a success was recorded
    Succeeded,
    /// Terminal: a failure was recorded
    Failed,
}

/// One unit of remote-API work.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct Job {
    id: JobId,
    payload: JobPayload,
    priority: Priority,
    attempts: u32,
    state: JobState,
}

impl Job {
    /// Creates a pending job for one chunk of one document.
    pub fn new(
        document_id: impl Into<String>,
        chunk_index: u32,
        kind: RequestKind,
        payload: JobPayload,
    ) -> Self {
        Self {
            id: JobId::new(document_id, chunk_index, kind),
            payload,
            priority: Priority::default(),
            attempts: 0,
            state: JobState::Pending,
        }
    }

    /// Sets the admission tier.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Request kind, taken from the identity.
    pub fn kind(&self) -> RequestKind {
        self.id.kind
    }

    /// Marks the start of another attempt and returns the new attempt count.
    ///
    /// The count only ever grows.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.state = JobState::InFlight;
        self.attempts
    }

    /// Moves the job to a new lifecycle state.
    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
    }
}
