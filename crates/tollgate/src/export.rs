//! JSON-lines export of recorded successes for downstream joins.

use serde::{Deserialize, Serialize};
use std::io::Write;
use tollgate_checkpoint::{Checkpoint, CheckpointEntry};
use tollgate_core::{JobId, RequestKind, ResponsePayload};
use tollgate_error::{JsonError, TollgateResult};

/// One exported success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Full job identity
    pub job_id: JobId,
    /// Source document identifier
    pub document_id: String,
    /// Chunk index within the document
    pub chunk_index: u32,
    /// Request kind
    pub kind: RequestKind,
    /// Response content
    pub response: ResponsePayload,
}

impl ExportRecord {
    /// Builds the record for a success, or `None` for a failure entry.
    pub fn from_entry(id: &JobId, entry: &CheckpointEntry) -> Option<Self> {
        match entry {
            CheckpointEntry::Succeeded { response, .. } => Some(Self {
                job_id: id.clone(),
                document_id: id.document_id().clone(),
                chunk_index: *id.chunk_index(),
                kind: *id.kind(),
                response: response.clone(),
            }),
            CheckpointEntry::Failed { .. } => None,
        }
    }
}

/// Writes one JSON line per recorded success, in job identity order, and
/// returns how many were written.
///
/// # Errors
///
/// Returns error if a record cannot be serialized or written.
pub fn export_successes<W: Write>(checkpoint: &Checkpoint, mut writer: W) -> TollgateResult<usize> {
    let mut written = 0;
    for (id, entry) in checkpoint.records() {
        let Some(record) = ExportRecord::from_entry(id, entry) else {
            continue;
        };
        serde_json::to_writer(&mut writer, &record)
            .map_err(|e| JsonError::new(format!("Failed to export {}: {}", id, e)))?;
        writeln!(writer).map_err(|e| JsonError::new(format!("Failed to export {}: {}", id, e)))?;
        written += 1;
    }
    writer
        .flush()
        .map_err(|e| JsonError::new(format!("Failed to flush export: {}", e)))?;
    Ok(written)
}
