//! Checkpoint storage for the batch pipeline.
//!
//! Each completed stage's parsed results are stored as a single JSON
//! blob at the path recorded in the checkpoint row. Writes are
//! write-once (the first write wins); reads retry with exponential
//! backoff and jitter up to a fixed ceiling.
//!
//! Enum dispatch keeps the storage swappable without async trait
//! objects; the filesystem implementation serves local operation and
//! tests, with the bucket-backed variant living behind the same paths.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;

use crate::error::AnalysisError;

/// Maximum read attempts before giving up.
const MAX_READ_ATTEMPTS: u32 = 5;

/// Base delay for read retries.
const READ_BACKOFF_BASE_MS: u64 = 200;

/// Upper bound on any single retry delay.
const READ_BACKOFF_CEILING_MS: u64 = 5_000;

/// Storage backend for pipeline checkpoints.
pub enum CheckpointStorage {
    /// Blobs under a local directory tree.
    Filesystem(FilesystemStorage),
}

impl CheckpointStorage {
    /// Filesystem-backed storage rooted at `root`.
    pub fn filesystem(root: &Path) -> Self {
        Self::Filesystem(FilesystemStorage {
            root: root.to_owned(),
        })
    }

    /// Store one stage's parsed results; returns the path to persist in
    /// the checkpoint row. Write-once: an existing blob is left intact.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Checkpoint`] if the blob cannot be written.
    pub async fn write(
        &self,
        run_id: &str,
        stage: &str,
        payload: &serde_json::Value,
    ) -> Result<String, AnalysisError> {
        match self {
            Self::Filesystem(fs) => fs.write(run_id, stage, payload).await,
        }
    }

    /// Read back a stage's parsed results from a recorded path.
    ///
    /// Retries with exponential backoff and jitter up to
    /// [`MAX_READ_ATTEMPTS`].
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Checkpoint`] once every attempt failed.
    pub async fn read(&self, path: &str) -> Result<serde_json::Value, AnalysisError> {
        match self {
            Self::Filesystem(fs) => fs.read_with_retry(path).await,
        }
    }
}

/// Checkpoint blobs under a local directory tree.
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    async fn write(
        &self,
        run_id: &str,
        stage: &str,
        payload: &serde_json::Value,
    ) -> Result<String, AnalysisError> {
        let dir = self.root.join(run_id);
        let path = dir.join(format!("{stage}.json"));
        let path_str = path.to_string_lossy().into_owned();

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path_str, "Checkpoint blob already exists, keeping it");
            return Ok(path_str);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AnalysisError::Checkpoint(format!("mkdir {}: {e}", dir.display())))?;
        let bytes = serde_json::to_vec(payload)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AnalysisError::Checkpoint(format!("write {path_str}: {e}")))?;
        Ok(path_str)
    }

    async fn read_with_retry(&self, path: &str) -> Result<serde_json::Value, AnalysisError> {
        let mut last_error = String::new();
        for attempt in 0..MAX_READ_ATTEMPTS {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    return serde_json::from_slice(&bytes).map_err(|e| {
                        AnalysisError::Checkpoint(format!("parse {path}: {e}"))
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
        }
        Err(AnalysisError::Checkpoint(format!(
            "read {path} failed after {MAX_READ_ATTEMPTS} attempts: {last_error}"
        )))
    }
}

/// Exponential backoff with jitter, capped at the ceiling.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = READ_BACKOFF_BASE_MS.saturating_mul(1_u64 << attempt.min(16));
    let capped = exp.min(READ_BACKOFF_CEILING_MS);
    let jitter = rand::rng().random_range(0..=capped / 4);
    Duration::from_millis(capped.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let d0 = backoff_delay(0);
        assert!(d0 >= Duration::from_millis(200));
        let d10 = backoff_delay(10);
        // Ceiling plus at most 25% jitter.
        assert!(d10 <= Duration::from_millis(6_250));
    }

    #[tokio::test]
    async fn write_is_write_once_and_reads_back() {
        let dir = std::env::temp_dir().join(format!("agora-ckpt-{}", uuid::Uuid::new_v4()));
        let storage = CheckpointStorage::filesystem(&dir);

        let first = serde_json::json!({"stage": "stage0", "items": [1, 2, 3]});
        let path = storage
            .write("run-a", "stage0", &first)
            .await
            .unwrap_or_default();
        assert!(!path.is_empty());

        // Second write must not clobber the blob.
        let second = serde_json::json!({"items": []});
        let path2 = storage
            .write("run-a", "stage0", &second)
            .await
            .unwrap_or_default();
        assert_eq!(path, path2);

        let read_back = storage.read(&path).await.unwrap_or_default();
        assert_eq!(read_back, first);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
