//! Vote store: idempotent per-(user, target) voting.
//!
//! Score and vote count live on the target row and are adjusted by the
//! `votes_apply_effects` trigger, never here. The upsert is keyed by the
//! `(user_id, target_type, target_id)` unique constraint: re-casting the
//! same value is a no-op, flipping direction moves the score by 2 and
//! leaves the vote count unchanged.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use agora_types::{TargetKind, UserId};

use crate::error::DbError;

/// A row from the `votes` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct VoteRow {
    /// Vote identifier.
    pub id: Uuid,
    /// The voting user.
    pub user_id: String,
    /// Kind of the voted target.
    pub target_type: String,
    /// Identifier of the voted target.
    pub target_id: Uuid,
    /// +1 or -1.
    pub value: i16,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
}

/// Operations on the `votes` table.
pub struct VoteStore<'a> {
    pool: &'a PgPool,
}

impl<'a> VoteStore<'a> {
    /// Create a vote store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Cast or update a vote. Retries once on a serialization failure.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] for a value outside {-1, +1} and
    /// [`DbError::NotFound`] if the target is missing or soft-deleted.
    pub async fn cast(
        &self,
        user: &UserId,
        target_type: TargetKind,
        target_id: Uuid,
        value: i16,
    ) -> Result<VoteRow, DbError> {
        if value != 1 && value != -1 {
            return Err(DbError::Validation("vote value must be +1 or -1".to_owned()));
        }
        self.ensure_target_live(target_type, target_id).await?;

        match self.upsert(user, target_type, target_id, value).await {
            Err(e) if e.is_serialization_failure() => {
                tracing::debug!(user = %user, target = %target_id, "Retrying vote upsert");
                self.upsert(user, target_type, target_id, value).await
            }
            other => other,
        }
    }

    /// Remove a user's vote from a target.
    ///
    /// The trigger applies `score -= old value` and `vote_count -= 1`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no vote exists or the target is
    /// missing or soft-deleted.
    pub async fn rescind(
        &self,
        user: &UserId,
        target_type: TargetKind,
        target_id: Uuid,
    ) -> Result<(), DbError> {
        self.ensure_target_live(target_type, target_id).await?;

        let result = sqlx::query(
            r"DELETE FROM votes
              WHERE user_id = $1 AND target_type = $2 AND target_id = $3",
        )
        .bind(user.as_str())
        .bind(target_type.as_str())
        .bind(target_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "vote by {user} on {} {target_id}",
                target_type.as_str()
            )));
        }
        Ok(())
    }

    /// Fetch a user's vote on a target, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(
        &self,
        user: &UserId,
        target_type: TargetKind,
        target_id: Uuid,
    ) -> Result<Option<VoteRow>, DbError> {
        let row = sqlx::query_as::<_, VoteRow>(
            r"SELECT * FROM votes
              WHERE user_id = $1 AND target_type = $2 AND target_id = $3",
        )
        .bind(user.as_str())
        .bind(target_type.as_str())
        .bind(target_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert(
        &self,
        user: &UserId,
        target_type: TargetKind,
        target_id: Uuid,
        value: i16,
    ) -> Result<VoteRow, DbError> {
        // Same-value conflicts must not fire the UPDATE trigger (the score
        // would be unchanged but updated_at would churn), so the upsert
        // only updates when the direction flips.
        let row = sqlx::query_as::<_, VoteRow>(
            r"INSERT INTO votes (user_id, target_type, target_id, value)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (user_id, target_type, target_id)
              DO UPDATE SET value = EXCLUDED.value
                  WHERE votes.value <> EXCLUDED.value
              RETURNING *",
        )
        .bind(user.as_str())
        .bind(target_type.as_str())
        .bind(target_id)
        .bind(value)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(row),
            // The DO UPDATE WHERE clause filtered the row out: same value,
            // nothing changed. Read the existing row back.
            None => self
                .get(user, target_type, target_id)
                .await?
                .ok_or_else(|| DbError::NotFound(format!("vote on {target_id}"))),
        }
    }

    async fn ensure_target_live(
        &self,
        target_type: TargetKind,
        target_id: Uuid,
    ) -> Result<(), DbError> {
        let table = match target_type {
            TargetKind::Post => "posts",
            TargetKind::Reply => "replies",
        };
        let live: Option<(Uuid,)> = sqlx::query_as(&format!(
            r"SELECT id FROM {table} WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(target_id)
        .fetch_optional(self.pool)
        .await?;
        if live.is_none() {
            return Err(DbError::NotFound(format!(
                "{} {target_id}",
                target_type.as_str()
            )));
        }
        Ok(())
    }
}
