//! Upstream document records and their segmentation into jobs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use tollgate_core::{Job, JobPayload, Priority, RequestKind};
use tollgate_error::{BuilderError, BuilderErrorKind, JsonError, TollgateResult};
use tollgate_models::{MAX_SEGMENT_TOKENS, TokenCounter};
use tracing::{debug, info, instrument, warn};

/// One line of the upstream JSON-lines input.
///
/// ```json
/// {"document_id": "US7654321B2", "kind": "embedding", "model": "text-embedding-3-small", "text": "A rotor assembly..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct DocumentRecord {
    /// Source document identifier
    document_id: String,
    /// What to request for each chunk
    kind: RequestKind,
    /// Model identifier
    model: String,
    /// Full document text
    text: String,
    /// System prompt for completions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_prompt: Option<String>,
    /// Upper bound on generated tokens per chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Admission tier
    #[serde(default)]
    priority: Priority,
}

impl DocumentRecord {
    /// Creates a record with default priority and no completion settings.
    pub fn new(
        document_id: impl Into<String>,
        kind: RequestKind,
        model: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            kind,
            model: model.into(),
            text: text.into(),
            system_prompt: None,
            max_tokens: None,
            priority: Priority::default(),
        }
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the completion budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the admission tier.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Parses JSON-lines document records. Blank lines are skipped.
///
/// # Errors
///
/// Returns error naming the first line that cannot be read or parsed.
pub fn parse_documents<R: BufRead>(reader: R) -> TollgateResult<Vec<DocumentRecord>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line
            .map_err(|e| JsonError::new(format!("Failed to read line {}: {}", index + 1, e)))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| JsonError::new(format!("Invalid document on line {}: {}", index + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

/// Reads a JSON-lines document file.
///
/// # Errors
///
/// Returns error if the file cannot be opened or a line cannot be parsed.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_documents(path: impl AsRef<Path>) -> TollgateResult<Vec<DocumentRecord>> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| {
        JsonError::new(format!(
            "Failed to open documents {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let records = parse_documents(std::io::BufReader::new(file))?;
    info!(documents = records.len(), "Read documents");
    Ok(records)
}

/// Splits documents into token-bounded chunks and turns each chunk into a
/// [`Job`].
///
/// Chunk `i` of a document becomes job `{kind}:{document_id}:{i}`, so the
/// same input always yields the same identities. The token estimate of a job
/// covers its chunk plus the system prompt.
#[derive(Debug, Clone)]
pub struct DocumentSegmenter {
    counter: TokenCounter,
    max_segment_tokens: usize,
}

impl DocumentSegmenter {
    /// Creates a segmenter producing chunks of at most [`MAX_SEGMENT_TOKENS`].
    pub fn new(counter: TokenCounter) -> Self {
        Self {
            counter,
            max_segment_tokens: MAX_SEGMENT_TOKENS,
        }
    }

    /// Sets the chunk size in tokens.
    pub fn with_max_segment_tokens(mut self, max_segment_tokens: usize) -> Self {
        self.max_segment_tokens = max_segment_tokens;
        self
    }

    /// Jobs for one document, in chunk order.
    ///
    /// A document with empty text yields no jobs and is logged as skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the text cannot be segmented.
    pub fn jobs(&self, record: &DocumentRecord) -> TollgateResult<Vec<Job>> {
        if record.text.is_empty() {
            warn!(
                document_id = %record.document_id,
                kind = %record.kind,
                "Skipping document with empty text"
            );
            return Ok(Vec::new());
        }

        let prompt_tokens = record
            .system_prompt
            .as_deref()
            .map_or(0, |prompt| self.counter.count(prompt));

        let chunks = self
            .counter
            .segment(&record.text, self.max_segment_tokens)?;
        debug!(
            document_id = %record.document_id,
            chunks = chunks.len(),
            "Segmented document"
        );

        chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| -> TollgateResult<Job> {
                let estimated = (self.counter.count(&chunk) + prompt_tokens) as u64;
                let mut builder = JobPayload::builder();
                builder
                    .model(record.model.clone())
                    .text(chunk)
                    .estimated_tokens(estimated);
                if let Some(prompt) = &record.system_prompt {
                    builder.system_prompt(prompt.clone());
                }
                if let Some(max_tokens) = record.max_tokens {
                    builder.max_tokens(max_tokens);
                }
                let payload = builder
                    .build()
                    .map_err(|e| BuilderError::from(e.to_string()))?;

                let chunk_index = u32::try_from(index).map_err(|_| {
                    BuilderError::new(BuilderErrorKind::InvalidField {
                        field: "chunk_index".to_string(),
                        reason: format!("too many chunks in {}", record.document_id),
                    })
                })?;
                Ok(
                    Job::new(record.document_id.clone(), chunk_index, record.kind, payload)
                        .with_priority(record.priority),
                )
            })
            .collect()
    }

    /// Jobs for every document, documents in input order.
    ///
    /// # Errors
    ///
    /// Returns error if two records share a document id and request kind,
    /// since their jobs would collide in the checkpoint.
    #[instrument(skip_all, fields(documents = records.len()))]
    pub fn jobs_for_all(&self, records: &[DocumentRecord]) -> TollgateResult<Vec<Job>> {
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        let mut skipped = 0;
        for record in records {
            if !seen.insert((record.kind, record.document_id.as_str())) {
                return Err(BuilderError::new(BuilderErrorKind::InvalidField {
                    field: "document_id".to_string(),
                    reason: format!(
                        "'{}' appears twice for {} requests",
                        record.document_id, record.kind
                    ),
                })
                .into());
            }
            let document_jobs = self.jobs(record)?;
            if document_jobs.is_empty() {
                skipped += 1;
            }
            jobs.extend(document_jobs);
        }
        if skipped > 0 {
            warn!(skipped, "Some documents produced no jobs");
        }
        info!(jobs = jobs.len(), skipped, "Prepared jobs");
        Ok(jobs)
    }
}
