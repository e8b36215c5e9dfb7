//! Analysis run tracker: the per-content run state machine.
//!
//! ```text
//! pending -> processing -> { completed, failed }
//! ```
//!
//! A partial unique index allows at most one non-terminal run per
//! (source type, source id); opening a second one surfaces as
//! [`DbError::Conflict`]. Retries open a fresh row with a new id once the
//! previous run is terminal.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use agora_types::TargetKind;

use crate::error::DbError;

/// Error message recorded when the sweeper fails a stuck run.
pub const STALE_RUN_MESSAGE: &str = "processing run exceeded the staleness threshold";

/// Error message recorded when a completed run produced no nodes.
pub const EMPTY_ANALYSIS_MESSAGE: &str = "discourse engine returned no analysis";

/// A row from the `analysis_runs` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct RunRow {
    /// Run identifier.
    pub id: Uuid,
    /// Kind of the analyzed content.
    pub source_type: String,
    /// Identifier of the analyzed content.
    pub source_id: Uuid,
    /// Hash of the analyzed content at open time.
    pub content_hash: String,
    /// Current lifecycle status.
    pub status: String,
    /// Failure description for failed runs.
    pub error_message: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last transition instant (drives staleness detection).
    pub updated_at: DateTime<Utc>,
}

/// Operations on the `analysis_runs` table.
pub struct RunStore<'a> {
    pool: &'a PgPool,
}

impl<'a> RunStore<'a> {
    /// Create a run store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a new pending run for a piece of content.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] when a non-terminal run already
    /// exists for the source (the idempotency invariant).
    pub async fn open(
        &self,
        source_type: TargetKind,
        source_id: Uuid,
        content_hash: &str,
    ) -> Result<RunRow, DbError> {
        let result = sqlx::query_as::<_, RunRow>(
            r"INSERT INTO analysis_runs (source_type, source_id, content_hash)
              VALUES ($1, $2, $3)
              RETURNING *",
        )
        .bind(source_type.as_str())
        .bind(source_id)
        .bind(content_hash)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from);

        match result {
            Err(e) if e.is_unique_violation() => Err(DbError::Conflict(format!(
                "analysis already in flight for {} {source_id}",
                source_type.as_str()
            ))),
            other => other,
        }
    }

    /// Atomically claim the oldest pending run for processing.
    ///
    /// `FOR UPDATE SKIP LOCKED` lets concurrent workers drain the queue
    /// without stepping on each other.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn claim_next_pending(&self) -> Result<Option<RunRow>, DbError> {
        let row = sqlx::query_as::<_, RunRow>(
            r"UPDATE analysis_runs SET status = 'processing'
              WHERE id = (
                  SELECT id FROM analysis_runs
                  WHERE status = 'pending'
                  ORDER BY created_at
                  LIMIT 1
                  FOR UPDATE SKIP LOCKED
              )
              RETURNING *",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Transition a run to `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the run is not in `processing`.
    pub async fn mark_completed(&self, id: Uuid) -> Result<(), DbError> {
        self.transition(id, "processing", "completed", None).await
    }

    /// Transition a run to `failed` with a descriptive message.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the run is not in `processing`.
    pub async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        self.transition(id, "processing", "failed", Some(message))
            .await
    }

    /// Fetch a run by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the run does not exist.
    pub async fn get(&self, id: Uuid) -> Result<RunRow, DbError> {
        sqlx::query_as::<_, RunRow>(r"SELECT * FROM analysis_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("analysis run {id}")))
    }

    /// Fetch the most recent run for a piece of content, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_for_source(
        &self,
        source_type: TargetKind,
        source_id: Uuid,
    ) -> Result<Option<RunRow>, DbError> {
        let row = sqlx::query_as::<_, RunRow>(
            r"SELECT * FROM analysis_runs
              WHERE source_type = $1 AND source_id = $2
              ORDER BY created_at DESC
              LIMIT 1",
        )
        .bind(source_type.as_str())
        .bind(source_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Fail every `processing` run whose last transition is older than
    /// `threshold_secs`. Returns the number of runs swept.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn sweep_stale(&self, threshold_secs: u64) -> Result<u64, DbError> {
        let interval = format!("{threshold_secs} seconds");
        let result = sqlx::query(
            r"UPDATE analysis_runs
              SET status = 'failed', error_message = $1
              WHERE status = 'processing'
                AND updated_at < now() - $2::interval",
        )
        .bind(STALE_RUN_MESSAGE)
        .bind(&interval)
        .execute(self.pool)
        .await?;
        let swept = result.rows_affected();
        if swept > 0 {
            tracing::warn!(swept, "Swept stale processing runs");
        }
        Ok(swept)
    }

    /// Fail `completed` runs that produced neither I-nodes nor S-nodes.
    /// Returns the number of runs demoted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn fail_empty_completed(&self) -> Result<u64, DbError> {
        let result = sqlx::query(
            r"UPDATE analysis_runs r
              SET status = 'failed', error_message = $1
              WHERE status = 'completed'
                AND NOT EXISTS
                    (SELECT 1 FROM information_nodes n WHERE n.run_id = r.id)
                AND NOT EXISTS
                    (SELECT 1 FROM scheme_nodes s WHERE s.run_id = r.id)",
        )
        .bind(EMPTY_ANALYSIS_MESSAGE)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a run; the schema cascades to every node and edge it created.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the run does not exist.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(r"DELETE FROM analysis_runs WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("analysis run {id}")));
        }
        Ok(())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: &str,
        to: &str,
        message: Option<&str>,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE analysis_runs
              SET status = $1, error_message = $2
              WHERE id = $3 AND status = $4",
        )
        .bind(to)
        .bind(message)
        .bind(id)
        .bind(from)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "analysis run {id} not in {from}"
            )));
        }
        Ok(())
    }
}
