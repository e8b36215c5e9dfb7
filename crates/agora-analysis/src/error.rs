//! Error types for the analysis pipeline.

use agora_db::DbError;
use agora_discourse::DiscourseError;

/// Errors that can occur in the analysis worker, batch orchestrator, or
/// gamification engine.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A data-layer operation failed.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// The discourse engine call failed.
    #[error("discourse engine error: {0}")]
    Discourse(#[from] DiscourseError),

    /// A checkpoint could not be written or read back.
    #[error("checkpoint storage error: {0}")]
    Checkpoint(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The external batch job reported a non-retriable failure.
    #[error("batch job failed: {0}")]
    BatchFailed(String),

    /// A configuration error (bad cron expression, missing system user).
    #[error("configuration error: {0}")]
    Config(String),
}
