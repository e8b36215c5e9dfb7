//! Batch pipeline orchestrator: multi-stage analysis over many pieces of
//! content, with per-stage checkpoints and resume-after-restart.
//!
//! For each stage the orchestrator submits a batch to the discourse
//! engine, persists the returned job name *before* awaiting results,
//! polls the job, stores the parsed results as a checkpoint blob, and
//! marks the stage completed. Stage N+1 starts only once stage N is
//! completed.
//!
//! On cold start, [`PipelineOrchestrator::resume`] walks every `running`
//! run: completed stages are replayed from their blobs, a stage with a
//! recorded job name is re-polled (never re-submitted), and only a stage
//! with no checkpoint at all submits fresh work.

use std::time::Duration;

use agora_db::{PipelineRunRow, PipelineStore, PostgresPool};
use agora_discourse::DiscourseClient;
use agora_types::{PipelineId, TargetKind};

use crate::checkpoint::CheckpointStorage;
use crate::error::AnalysisError;

/// The pipeline's stages, in execution order.
pub const STAGES: [&str; 4] = ["stage0", "stage1-fvp", "stage2-rewrite", "stage3-graph"];

/// Default delay between polls of an external job.
const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(30);

/// The batch pipeline orchestrator.
pub struct PipelineOrchestrator {
    pool: PostgresPool,
    discourse: DiscourseClient,
    storage: CheckpointStorage,
    poll_delay: Duration,
}

impl PipelineOrchestrator {
    /// Create an orchestrator bound to the shared pool, engine client,
    /// and checkpoint storage.
    pub const fn new(
        pool: PostgresPool,
        discourse: DiscourseClient,
        storage: CheckpointStorage,
    ) -> Self {
        Self {
            pool,
            discourse,
            storage,
            poll_delay: DEFAULT_POLL_DELAY,
        }
    }

    /// Override the poll delay (tests).
    #[must_use]
    pub const fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Start a fresh pipeline run over content of one kind that has no
    /// completed analysis yet.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`](agora_db::DbError::Conflict) if the
    /// run id is taken, or the stage error that failed the run (the run
    /// row is marked failed first).
    pub async fn start(
        &self,
        id: &PipelineId,
        source_type: TargetKind,
        limit: i64,
    ) -> Result<(), AnalysisError> {
        let store = PipelineStore::new(self.pool.pool());
        let texts = self.gather_texts(source_type, limit).await?;
        let text_count = i32::try_from(texts.len()).unwrap_or(i32::MAX);
        store.create_run(id, source_type, text_count).await?;
        tracing::info!(run = %id, texts = texts.len(), "Pipeline run started");

        let initial = serde_json::Value::Array(
            texts
                .into_iter()
                .map(|t| serde_json::json!({ "text": t }))
                .collect(),
        );
        self.drive(id, initial, 0).await
    }

    /// Resume every `running` pipeline after a cold restart.
    ///
    /// # Errors
    ///
    /// Returns the first [`AnalysisError`] that prevents resuming; runs
    /// that fail individually are marked failed and skipped.
    pub async fn resume(&self) -> Result<(), AnalysisError> {
        let store = PipelineStore::new(self.pool.pool());
        let running = store.running_runs().await?;
        if running.is_empty() {
            tracing::debug!("No pipeline runs to resume");
            return Ok(());
        }
        futures::future::join_all(running.iter().map(|run| async move {
            tracing::info!(run = %run.id, "Resuming pipeline run");
            if let Err(e) = self.resume_run(run).await {
                tracing::warn!(run = %run.id, error = %e, "Pipeline resume failed");
            }
        }))
        .await;
        Ok(())
    }

    async fn resume_run(&self, run: &PipelineRunRow) -> Result<(), AnalysisError> {
        let id = PipelineId::new(&run.id)
            .ok_or_else(|| AnalysisError::Config(format!("bad pipeline id {}", run.id)))?;
        let store = PipelineStore::new(self.pool.pool());
        let checkpoints = store.checkpoints_for_run(&id).await?;

        // Find the first stage that is not completed; replay the one
        // before it from its blob.
        let mut payload: Option<serde_json::Value> = None;
        let mut next_stage = 0_usize;
        for (i, stage) in STAGES.iter().enumerate() {
            let Some(checkpoint) = checkpoints.iter().find(|c| c.stage == *stage) else {
                break;
            };
            if checkpoint.completed {
                let path = checkpoint.gcs_path.as_deref().ok_or_else(|| {
                    AnalysisError::Checkpoint(format!(
                        "completed checkpoint {}/{stage} has no blob path",
                        run.id
                    ))
                })?;
                payload = Some(self.storage.read(path).await?);
                next_stage = i.saturating_add(1);
            } else if let Some(job) = checkpoint.gemini_job_name.as_deref() {
                // Submitted but unfinished: re-poll, never re-submit.
                tracing::info!(run = %run.id, stage, job, "Re-polling in-flight stage");
                let results = self.poll_until_done(job).await?;
                let path = self.storage.write(run.id.as_str(), stage, &results).await?;
                store.complete_stage(&id, stage, &path).await?;
                payload = Some(results);
                next_stage = i.saturating_add(1);
            } else {
                break;
            }
        }

        let Some(payload) = payload else {
            // No checkpoint at all: the run never submitted anything.
            let source_type = TargetKind::parse(&run.source_type).ok_or_else(|| {
                AnalysisError::Config(format!("bad source type {}", run.source_type))
            })?;
            let texts = self
                .gather_texts(source_type, i64::from(run.text_count))
                .await?;
            let initial = serde_json::Value::Array(
                texts
                    .into_iter()
                    .map(|t| serde_json::json!({ "text": t }))
                    .collect(),
            );
            return self.drive(&id, initial, 0).await;
        };

        if next_stage >= STAGES.len() {
            store.complete_run(&id).await?;
            tracing::info!(run = %run.id, "Pipeline run completed on resume");
            return Ok(());
        }
        self.drive(&id, payload, next_stage).await
    }

    /// Run stages `from..` with `payload` as the first stage's input.
    async fn drive(
        &self,
        id: &PipelineId,
        mut payload: serde_json::Value,
        from: usize,
    ) -> Result<(), AnalysisError> {
        let store = PipelineStore::new(self.pool.pool());
        for stage in STAGES.iter().skip(from) {
            match self.run_stage(id, stage, &payload).await {
                Ok(results) => payload = results,
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(run = %id, stage, error = %message, "Stage failed");
                    // Partial checkpoints are retained for forensics.
                    store.fail_run(id, &message).await?;
                    return Err(e);
                }
            }
        }
        store.complete_run(id).await?;
        tracing::info!(run = %id, "Pipeline run completed");
        Ok(())
    }

    async fn run_stage(
        &self,
        id: &PipelineId,
        stage: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, AnalysisError> {
        let store = PipelineStore::new(self.pool.pool());
        let requests = stage_requests(input);
        let request_count = i32::try_from(requests.len()).unwrap_or(i32::MAX);

        let job = self.discourse.batch_submit(stage, requests).await?;
        // Persist the job name before awaiting anything so a cold
        // restart can re-poll instead of re-submitting.
        store
            .record_submission(id, stage, &job, request_count)
            .await?;

        let results = self.poll_until_done(&job).await?;
        let path = self.storage.write(id.as_str(), stage, &results).await?;
        store.complete_stage(id, stage, &path).await?;
        tracing::info!(run = %id, stage, "Stage completed");
        Ok(results)
    }

    async fn poll_until_done(&self, job: &str) -> Result<serde_json::Value, AnalysisError> {
        loop {
            let poll = self.discourse.batch_poll(job).await?;
            if poll.done {
                if let Some(error) = poll.error {
                    return Err(AnalysisError::BatchFailed(error));
                }
                return Ok(poll.results.unwrap_or(serde_json::Value::Null));
            }
            tokio::time::sleep(self.poll_delay).await;
        }
    }

    /// Texts of non-deleted content of one kind that has no completed
    /// analysis run yet, oldest first.
    async fn gather_texts(
        &self,
        source_type: TargetKind,
        limit: i64,
    ) -> Result<Vec<String>, AnalysisError> {
        let sql = match source_type {
            TargetKind::Post => {
                r"SELECT p.title || E'\n' || p.content
                  FROM posts p
                  WHERE p.deleted_at IS NULL
                    AND NOT EXISTS (
                        SELECT 1 FROM analysis_runs r
                        WHERE r.source_type = 'post'
                          AND r.source_id = p.id
                          AND r.status = 'completed'
                    )
                  ORDER BY p.created_at
                  LIMIT $1"
            }
            TargetKind::Reply => {
                r"SELECT rp.content
                  FROM replies rp
                  WHERE rp.deleted_at IS NULL
                    AND NOT EXISTS (
                        SELECT 1 FROM analysis_runs r
                        WHERE r.source_type = 'reply'
                          AND r.source_id = rp.id
                          AND r.status = 'completed'
                    )
                  ORDER BY rp.created_at
                  LIMIT $1"
            }
        };
        let rows: Vec<(String,)> = sqlx::query_as(sql)
            .bind(limit)
            .fetch_all(self.pool.pool())
            .await
            .map_err(agora_db::DbError::from)?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }
}

/// Shape a stage input into the engine's per-text request objects.
fn stage_requests(input: &serde_json::Value) -> Vec<serde_json::Value> {
    match input {
        serde_json::Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_follow_the_convention() {
        assert_eq!(STAGES[0], "stage0");
        assert!(STAGES[1].starts_with("stage1-"));
        assert_eq!(STAGES.len(), 4);
    }

    #[test]
    fn stage_requests_unwrap_arrays() {
        let input = serde_json::json!([{"text": "a"}, {"text": "b"}]);
        assert_eq!(stage_requests(&input).len(), 2);

        let scalar = serde_json::json!({"combined": true});
        assert_eq!(stage_requests(&scalar).len(), 1);
    }
}
