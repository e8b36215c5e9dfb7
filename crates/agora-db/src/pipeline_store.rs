//! Batch pipeline persistence: run rows and per-stage checkpoints.
//!
//! The orchestrator persists a checkpoint row *before* awaiting the
//! external job, so a cold restart can re-poll the recorded
//! `gemini_job_name` instead of re-submitting. A completed checkpoint
//! additionally records the object-storage path of its parsed results.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use agora_types::{PipelineId, TargetKind};

use crate::error::DbError;

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PipelineRunRow {
    /// Operator-chosen run id.
    pub id: String,
    /// running / completed / failed.
    pub status: String,
    /// Kind of content the pipeline processes.
    pub source_type: String,
    /// Number of texts in the run.
    pub text_count: i32,
    /// Failure description for failed runs.
    pub error_message: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
}

/// A row from the `pipeline_checkpoints` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct CheckpointRow {
    /// Checkpoint identifier.
    pub id: Uuid,
    /// The pipeline run this checkpoint belongs to.
    pub run_id: String,
    /// Stage name (`stage0`, `stage1-fvp`, ...).
    pub stage: String,
    /// External job name, set once the batch is submitted.
    pub gemini_job_name: Option<String>,
    /// Number of requests in the submitted batch.
    pub request_count: i32,
    /// Object-storage path of the parsed results, set on completion.
    pub gcs_path: Option<String>,
    /// Whether the stage finished and its results were persisted.
    pub completed: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
}

/// Operations on the pipeline tables.
pub struct PipelineStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PipelineStore<'a> {
    /// Create a pipeline store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new `running` pipeline run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the run id is already taken.
    pub async fn create_run(
        &self,
        id: &PipelineId,
        source_type: TargetKind,
        text_count: i32,
    ) -> Result<PipelineRunRow, DbError> {
        let result = sqlx::query_as::<_, PipelineRunRow>(
            r"INSERT INTO pipeline_runs (id, source_type, text_count)
              VALUES ($1, $2, $3)
              RETURNING *",
        )
        .bind(id.as_str())
        .bind(source_type.as_str())
        .bind(text_count)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from);

        match result {
            Err(e) if e.is_unique_violation() => {
                Err(DbError::Conflict(format!("pipeline run {id} already exists")))
            }
            other => other,
        }
    }

    /// Fetch a pipeline run by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the run does not exist.
    pub async fn get_run(&self, id: &PipelineId) -> Result<PipelineRunRow, DbError> {
        sqlx::query_as::<_, PipelineRunRow>(r"SELECT * FROM pipeline_runs WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("pipeline run {id}")))
    }

    /// All runs still in `running`, oldest first (resume order).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn running_runs(&self) -> Result<Vec<PipelineRunRow>, DbError> {
        let rows = sqlx::query_as::<_, PipelineRunRow>(
            r"SELECT * FROM pipeline_runs
              WHERE status = 'running'
              ORDER BY created_at",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Transition a run to `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the run is not `running`.
    pub async fn complete_run(&self, id: &PipelineId) -> Result<(), DbError> {
        self.finish_run(id, "completed", None).await
    }

    /// Transition a run to `failed`, retaining partial checkpoints for
    /// forensic use.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the run is not `running`.
    pub async fn fail_run(&self, id: &PipelineId, message: &str) -> Result<(), DbError> {
        self.finish_run(id, "failed", Some(message)).await
    }

    /// Record a stage submission: the external job name and request
    /// count, before any await on the job. Re-submitting an incomplete
    /// stage refreshes the job name; completed stages are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn record_submission(
        &self,
        run_id: &PipelineId,
        stage: &str,
        gemini_job_name: &str,
        request_count: i32,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO pipeline_checkpoints
                  (run_id, stage, gemini_job_name, request_count)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (run_id, stage)
              DO UPDATE SET gemini_job_name = EXCLUDED.gemini_job_name,
                            request_count = EXCLUDED.request_count
                  WHERE pipeline_checkpoints.completed = FALSE",
        )
        .bind(run_id.as_str())
        .bind(stage)
        .bind(gemini_job_name)
        .bind(request_count)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Mark a stage completed and record where its parsed results live.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no checkpoint row exists.
    pub async fn complete_stage(
        &self,
        run_id: &PipelineId,
        stage: &str,
        gcs_path: &str,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE pipeline_checkpoints
              SET completed = TRUE, gcs_path = $3
              WHERE run_id = $1 AND stage = $2",
        )
        .bind(run_id.as_str())
        .bind(stage)
        .bind(gcs_path)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "checkpoint {run_id}/{stage}"
            )));
        }
        Ok(())
    }

    /// All checkpoints of a run, in stage-name order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn checkpoints_for_run(
        &self,
        run_id: &PipelineId,
    ) -> Result<Vec<CheckpointRow>, DbError> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            r"SELECT * FROM pipeline_checkpoints
              WHERE run_id = $1
              ORDER BY stage",
        )
        .bind(run_id.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn finish_run(
        &self,
        id: &PipelineId,
        status: &str,
        message: Option<&str>,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE pipeline_runs
              SET status = $1, error_message = $2
              WHERE id = $3 AND status = 'running'",
        )
        .bind(status)
        .bind(message)
        .bind(id.as_str())
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("running pipeline {id}")));
        }
        Ok(())
    }
}
