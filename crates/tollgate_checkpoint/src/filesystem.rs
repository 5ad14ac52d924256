//! Filesystem checkpoint store.
//!
//! The snapshot is a single pretty-printed JSON document. Writes go to a
//! sibling temp file which is then renamed over the snapshot.

use crate::{CHECKPOINT_VERSION, Checkpoint, CheckpointStore};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tollgate_error::{CheckpointError, CheckpointErrorKind};

/// Filesystem checkpoint backend.
///
/// ```text
/// run/
/// ├── tollgate-checkpoint.json      (last complete snapshot)
/// └── tollgate-checkpoint.json.tmp  (only while a write is in progress)
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemCheckpointStore {
    path: PathBuf,
}

impl FileSystemCheckpointStore {
    /// Create a store writing to `path`.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(path))]
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CheckpointError::new(CheckpointErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        tracing::debug!(path = %path.display(), "Opened filesystem checkpoint store");
        Ok(Self { path })
    }

    /// Snapshot location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = OsString::from(self.path.as_os_str());
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

#[async_trait::async_trait]
impl CheckpointStore for FileSystemCheckpointStore {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No prior checkpoint");
                return Ok(None);
            }
            Err(e) => {
                return Err(CheckpointError::new(CheckpointErrorKind::FileRead(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                ))));
            }
        };

        let checkpoint: Checkpoint = serde_json::from_slice(&data).map_err(|e| {
            CheckpointError::new(CheckpointErrorKind::Malformed(format!(
                "{}: {}",
                self.path.display(),
                e
            )))
        })?;

        if *checkpoint.version() != CHECKPOINT_VERSION {
            return Err(CheckpointError::new(
                CheckpointErrorKind::UnsupportedVersion {
                    found: *checkpoint.version(),
                    expected: CHECKPOINT_VERSION,
                },
            ));
        }

        tracing::info!(
            records = checkpoint.records().len(),
            succeeded = checkpoint.succeeded(),
            "Loaded checkpoint"
        );
        Ok(Some(checkpoint))
    }

    #[tracing::instrument(skip(self, checkpoint), fields(path = %self.path.display(), records = checkpoint.records().len()))]
    async fn persist(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let data = serde_json::to_vec_pretty(checkpoint).map_err(|e| {
            CheckpointError::new(CheckpointErrorKind::Malformed(e.to_string()))
        })?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &data).await.map_err(|e| {
            CheckpointError::new(CheckpointErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            CheckpointError::new(CheckpointErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            )))
        })?;

        tracing::debug!(size = data.len(), "Persisted checkpoint");
        Ok(())
    }
}
