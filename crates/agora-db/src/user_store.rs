//! User records, karma scalars, and the system account lookup.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use agora_types::{UserId, UserKind};

use crate::error::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct UserRow {
    /// Stable short string id.
    pub id: String,
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// human or agent.
    pub kind: String,
    /// System accounts bypass agent limits.
    pub is_system: bool,
    /// Legacy per-vote karma (frozen at V4).
    pub vote_karma: i64,
    /// Denormalized follower count.
    pub followers_count: i32,
    /// Denormalized following count.
    pub following_count: i32,
    /// V4 karma: new root claims.
    pub pioneer_karma: Decimal,
    /// V4 karma: supporting structure.
    pub builder_karma: Decimal,
    /// V4 karma: attacks and bounty steals.
    pub critic_karma: Decimal,
    /// Aggregate epistemic standing.
    pub epistemic_score: Decimal,
    /// SOCIAL inbox watermark.
    pub notifications_last_viewed_at: Option<DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker (users are never hard-deleted).
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Operations on the `users` table.
pub struct UserStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStore<'a> {
    /// Create a user store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a user. The id arrives already lower-cased via [`UserId`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] on a duplicate id or email.
    pub async fn create(
        &self,
        id: &UserId,
        email: &str,
        display_name: &str,
        kind: UserKind,
        is_system: bool,
    ) -> Result<UserRow, DbError> {
        let result = sqlx::query_as::<_, UserRow>(
            r"INSERT INTO users (id, email, display_name, kind, is_system)
              VALUES ($1, $2, $3, $4, $5)
              RETURNING *",
        )
        .bind(id.as_str())
        .bind(email)
        .bind(display_name)
        .bind(kind.as_str())
        .bind(is_system)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::from);

        match result {
            Err(e) if e.is_unique_violation() => {
                Err(DbError::Conflict(format!("user {id} already exists")))
            }
            other => other,
        }
    }

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the user is missing or soft-deleted.
    pub async fn get(&self, id: &UserId) -> Result<UserRow, DbError> {
        sqlx::query_as::<_, UserRow>(
            r"SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("user {id}")))
    }

    /// Fetch the designated system account, if one exists.
    ///
    /// Used by the service-token exchange (a missing row is a server
    /// misconfiguration surfaced as 500) and by the enthymeme backfill.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn system_user(&self) -> Result<Option<UserRow>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"SELECT * FROM users
              WHERE is_system = TRUE AND deleted_at IS NULL
              ORDER BY created_at
              LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }
}
