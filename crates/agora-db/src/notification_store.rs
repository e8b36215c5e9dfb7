//! Unified notification inbox: SOCIAL reply-coalescing plus EPISTEMIC
//! rows from the gamification engine.
//!
//! The table is unique per (user, target type, target id), so SOCIAL
//! notifications coalesce: N replies to the same content produce one row
//! with `reply_count = N`. Inserts use `ON CONFLICT DO UPDATE` and are
//! safe to retry. The inbox is pull-only.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use agora_types::{EpistemicNotificationType, NotificationCategory, TargetKind, UserId};

use crate::error::DbError;

/// A row from the `notifications` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    /// Notification identifier.
    pub id: Uuid,
    /// The notified user.
    pub user_id: String,
    /// SOCIAL or EPISTEMIC.
    pub category: String,
    /// Kind of the target entity.
    pub target_type: String,
    /// Identifier of the target entity.
    pub target_id: Uuid,
    /// Coalesced reply count (SOCIAL only).
    pub reply_count: i32,
    /// Most recent replying user (SOCIAL only).
    pub last_reply_author_id: Option<String>,
    /// EPISTEMIC subtype, when applicable.
    pub epistemic_type: Option<String>,
    /// Opaque domain payload (EPISTEMIC only).
    pub payload: Option<serde_json::Value>,
    /// Per-row read flag (EPISTEMIC; SOCIAL uses the user's
    /// `notifications_last_viewed_at`).
    pub is_read: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last coalescing write (orders the inbox).
    pub updated_at: DateTime<Utc>,
}

/// Operations on the `notifications` table.
pub struct NotificationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationStore<'a> {
    /// Create a notification store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a reply to `recipient`'s content, coalescing with any
    /// existing SOCIAL notification for the same target.
    ///
    /// Self-replies are the caller's concern: call only when the replier
    /// differs from the content author.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn record_reply(
        &self,
        recipient: &UserId,
        target_type: TargetKind,
        target_id: Uuid,
        replier: &UserId,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO notifications
                  (user_id, category, target_type, target_id,
                   reply_count, last_reply_author_id)
              VALUES ($1, 'SOCIAL', $2, $3, 1, $4)
              ON CONFLICT (user_id, target_type, target_id)
              DO UPDATE SET reply_count = notifications.reply_count + 1,
                            last_reply_author_id = EXCLUDED.last_reply_author_id,
                            updated_at = now()",
        )
        .bind(recipient.as_str())
        .bind(target_type.as_str())
        .bind(target_id)
        .bind(replier.as_str())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Insert an EPISTEMIC notification.
    ///
    /// Retry-safe: a duplicate (user, target) keeps the freshest payload.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn record_epistemic(
        &self,
        recipient: &UserId,
        target_type: &str,
        target_id: Uuid,
        kind: EpistemicNotificationType,
        payload: &serde_json::Value,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO notifications
                  (user_id, category, target_type, target_id, epistemic_type, payload)
              VALUES ($1, 'EPISTEMIC', $2, $3, $4, $5)
              ON CONFLICT (user_id, target_type, target_id)
              DO UPDATE SET epistemic_type = EXCLUDED.epistemic_type,
                            payload = EXCLUDED.payload,
                            is_read = FALSE,
                            updated_at = now()",
        )
        .bind(recipient.as_str())
        .bind(target_type)
        .bind(target_id)
        .bind(kind.as_str())
        .bind(payload)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// List a user's notifications in one category, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(
        &self,
        user: &UserId,
        category: NotificationCategory,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<NotificationRow>, DbError> {
        let rows = match before {
            Some(ts) => {
                sqlx::query_as::<_, NotificationRow>(
                    r"SELECT * FROM notifications
                      WHERE user_id = $1 AND category = $2 AND updated_at < $3
                      ORDER BY updated_at DESC
                      LIMIT $4",
                )
                .bind(user.as_str())
                .bind(category.as_str())
                .bind(ts)
                .bind(limit)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, NotificationRow>(
                    r"SELECT * FROM notifications
                      WHERE user_id = $1 AND category = $2
                      ORDER BY updated_at DESC
                      LIMIT $3",
                )
                .bind(user.as_str())
                .bind(category.as_str())
                .bind(limit)
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Mark one EPISTEMIC notification read.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the row does not belong to the user.
    pub async fn mark_read(&self, user: &UserId, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE notifications SET is_read = TRUE
              WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user.as_str())
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }

    /// Stamp the user's SOCIAL inbox as viewed now.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn touch_last_viewed(&self, user: &UserId) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE users SET notifications_last_viewed_at = now() WHERE id = $1",
        )
        .bind(user.as_str())
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
