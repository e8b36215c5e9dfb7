//! Follow graph: follow/unfollow plus paginated follower listings.
//!
//! Denormalized `followers_count` / `following_count` on both endpoints
//! are maintained by the `follows_adjust_counts` trigger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use agora_types::UserId;

use crate::error::DbError;

/// A user as seen in a follower/following listing.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct FollowEntry {
    /// The listed user's id.
    pub user_id: String,
    /// The listed user's display name.
    pub display_name: String,
    /// When the follow edge was created (doubles as the page cursor).
    pub followed_at: DateTime<Utc>,
}

/// Operations on the `follows` table.
pub struct FollowStore<'a> {
    pool: &'a PgPool,
}

impl<'a> FollowStore<'a> {
    /// Create a follow store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Follow a user. Idempotent: re-following is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] on a self-follow and
    /// [`DbError::NotFound`] if the target user does not exist.
    pub async fn follow(&self, follower: &UserId, following: &UserId) -> Result<(), DbError> {
        if follower == following {
            return Err(DbError::Validation("cannot follow yourself".to_owned()));
        }
        self.ensure_user(following).await?;

        sqlx::query(
            r"INSERT INTO follows (follower_id, following_id)
              VALUES ($1, $2)
              ON CONFLICT (follower_id, following_id) DO NOTHING",
        )
        .bind(follower.as_str())
        .bind(following.as_str())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Unfollow a user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no follow edge exists.
    pub async fn unfollow(&self, follower: &UserId, following: &UserId) -> Result<(), DbError> {
        let result = sqlx::query(
            r"DELETE FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower.as_str())
        .bind(following.as_str())
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "follow {follower} -> {following}"
            )));
        }
        Ok(())
    }

    /// List the users following `user`, most recent first.
    ///
    /// `before` is the ISO-8601 `created_at` cursor of the last row on the
    /// previous page. Soft-deleted users are filtered out.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_followers(
        &self,
        user: &UserId,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<FollowEntry>, DbError> {
        self.list_edges(user, limit, before, true).await
    }

    /// List the users `user` follows, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_following(
        &self,
        user: &UserId,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<FollowEntry>, DbError> {
        self.list_edges(user, limit, before, false).await
    }

    async fn list_edges(
        &self,
        user: &UserId,
        limit: i64,
        before: Option<DateTime<Utc>>,
        followers: bool,
    ) -> Result<Vec<FollowEntry>, DbError> {
        // followers: who follows `user`; following: whom `user` follows.
        let (match_col, select_col) = if followers {
            ("following_id", "follower_id")
        } else {
            ("follower_id", "following_id")
        };

        let sql = format!(
            r"SELECT f.{select_col} AS user_id, u.display_name, f.created_at AS followed_at
              FROM follows f
              JOIN users u ON u.id = f.{select_col}
              WHERE f.{match_col} = $1
                AND u.deleted_at IS NULL
                {cursor_clause}
              ORDER BY f.created_at DESC
              LIMIT ${limit_param}",
            cursor_clause = if before.is_some() {
                "AND f.created_at < $2"
            } else {
                ""
            },
            limit_param = if before.is_some() { 3 } else { 2 },
        );

        let rows = match before {
            Some(ts) => {
                sqlx::query_as::<_, FollowEntry>(&sql)
                    .bind(user.as_str())
                    .bind(ts)
                    .bind(limit)
                    .fetch_all(self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, FollowEntry>(&sql)
                    .bind(user.as_str())
                    .bind(limit)
                    .fetch_all(self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn ensure_user(&self, user: &UserId) -> Result<(), DbError> {
        let exists: Option<(String,)> = sqlx::query_as(
            r"SELECT id FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user.as_str())
        .fetch_optional(self.pool)
        .await?;
        if exists.is_none() {
            return Err(DbError::NotFound(format!("user {user}")));
        }
        Ok(())
    }
}
