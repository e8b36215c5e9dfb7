//! Feed ranking over posts: hot, new, top, rising, controversial.
//!
//! All sorts page with an opaque cursor encoding the `(created_at, id)`
//! pair of the last row (see [`crate::cursor`]). Sorts ordered by score
//! or vote count re-read the cursor row's rank column so the keyset
//! comparison stays correct across pages. Pages overfetch by one row to
//! compute `has_more`.

use sqlx::PgPool;
use uuid::Uuid;

use agora_types::FeedSort;

use crate::content_store::PostRow;
use crate::cursor::Cursor;
use crate::error::DbError;

/// Default rising-window size in hours.
pub const DEFAULT_RISING_WINDOW_HOURS: i64 = 24;

/// Controversy band: candidates keep `|score| / vote_count` at or below
/// this ratio.
pub const CONTROVERSY_RATIO: f64 = 0.2;

/// One page of ranked posts.
#[derive(Debug, Clone)]
pub struct FeedPage {
    /// The page rows.
    pub items: Vec<PostRow>,
    /// Opaque cursor for the next page, when one exists.
    pub next_cursor: Option<String>,
    /// Whether more rows exist past this page.
    pub has_more: bool,
}

/// Ranked feed queries over the `posts` table.
pub struct FeedRanker<'a> {
    pool: &'a PgPool,
    rising_window_hours: i64,
}

impl<'a> FeedRanker<'a> {
    /// Create a feed ranker bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            rising_window_hours: DEFAULT_RISING_WINDOW_HOURS,
        }
    }

    /// Override the rising-window size.
    #[must_use]
    pub const fn with_rising_window_hours(mut self, hours: i64) -> Self {
        self.rising_window_hours = hours;
        self
    }

    /// Fetch one ranked page.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] for a malformed cursor and
    /// [`DbError::Postgres`] if the query fails.
    pub async fn page(
        &self,
        sort: FeedSort,
        limit: i64,
        cursor: Option<&str>,
    ) -> Result<FeedPage, DbError> {
        let cursor = cursor.map(Cursor::decode).transpose()?;
        let overfetch = limit.saturating_add(1);

        let rows = match sort {
            FeedSort::New => self.page_new(overfetch, cursor).await?,
            FeedSort::Hot | FeedSort::Top => self.page_by_score(overfetch, cursor).await?,
            FeedSort::Rising => self.page_rising(overfetch, cursor).await?,
            FeedSort::Controversial => self.page_controversial(overfetch, cursor).await?,
        };

        Ok(paginate(rows, limit))
    }

    async fn page_new(
        &self,
        overfetch: i64,
        cursor: Option<Cursor>,
    ) -> Result<Vec<PostRow>, DbError> {
        let rows = match cursor {
            Some(c) => {
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL AND (created_at, id) < ($1, $2)
                      ORDER BY created_at DESC, id DESC
                      LIMIT $3",
                )
                .bind(c.created_at)
                .bind(c.id)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL
                      ORDER BY created_at DESC, id DESC
                      LIMIT $1",
                )
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Hot and top share the `score DESC, created_at DESC` ordering; hot
    /// additionally rides the partial index over non-deleted rows (the
    /// WHERE clause is identical, the planner picks the index).
    async fn page_by_score(
        &self,
        overfetch: i64,
        cursor: Option<Cursor>,
    ) -> Result<Vec<PostRow>, DbError> {
        let rows = match cursor {
            Some(c) => {
                let anchor_score = self.score_of(c.id).await?;
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL
                        AND (score, created_at, id) < ($1, $2, $3)
                      ORDER BY score DESC, created_at DESC, id DESC
                      LIMIT $4",
                )
                .bind(anchor_score)
                .bind(c.created_at)
                .bind(c.id)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL
                      ORDER BY score DESC, created_at DESC, id DESC
                      LIMIT $1",
                )
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn page_rising(
        &self,
        overfetch: i64,
        cursor: Option<Cursor>,
    ) -> Result<Vec<PostRow>, DbError> {
        let window = format!("{} hours", self.rising_window_hours);
        let rows = match cursor {
            Some(c) => {
                let anchor_votes = self.vote_count_of(c.id).await?;
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL
                        AND created_at > now() - $1::interval
                        AND (vote_count, created_at, id) < ($2, $3, $4)
                      ORDER BY vote_count DESC, created_at DESC, id DESC
                      LIMIT $5",
                )
                .bind(&window)
                .bind(anchor_votes)
                .bind(c.created_at)
                .bind(c.id)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL
                        AND created_at > now() - $1::interval
                      ORDER BY vote_count DESC, created_at DESC, id DESC
                      LIMIT $2",
                )
                .bind(&window)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Controversial: heavily-voted posts whose score stays near zero.
    /// Rank is monotone in `min(up, down)` and inverse in `|score|`:
    /// the band filter keeps `|score| / vote_count` at or below
    /// [`CONTROVERSY_RATIO`], then vote count decides.
    async fn page_controversial(
        &self,
        overfetch: i64,
        cursor: Option<Cursor>,
    ) -> Result<Vec<PostRow>, DbError> {
        let rows = match cursor {
            Some(c) => {
                let anchor_votes = self.vote_count_of(c.id).await?;
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL
                        AND vote_count > 0
                        AND abs(score)::float8 / vote_count <= $1
                        AND (vote_count, created_at, id) < ($2, $3, $4)
                      ORDER BY vote_count DESC, created_at DESC, id DESC
                      LIMIT $5",
                )
                .bind(CONTROVERSY_RATIO)
                .bind(anchor_votes)
                .bind(c.created_at)
                .bind(c.id)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PostRow>(
                    r"SELECT * FROM posts
                      WHERE deleted_at IS NULL
                        AND vote_count > 0
                        AND abs(score)::float8 / vote_count <= $1
                      ORDER BY vote_count DESC, created_at DESC, id DESC
                      LIMIT $2",
                )
                .bind(CONTROVERSY_RATIO)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn score_of(&self, id: Uuid) -> Result<i32, DbError> {
        let row: Option<(i32,)> = sqlx::query_as(r"SELECT score FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map_or(i32::MIN, |(s,)| s))
    }

    async fn vote_count_of(&self, id: Uuid) -> Result<i32, DbError> {
        let row: Option<(i32,)> = sqlx::query_as(r"SELECT vote_count FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map_or(i32::MIN, |(v,)| v))
    }
}

/// Trim an overfetched row set down to one page with cursor metadata.
fn paginate(mut rows: Vec<PostRow>, limit: i64) -> FeedPage {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let next_cursor = if has_more {
        rows.last().map(|r| {
            Cursor {
                created_at: r.created_at,
                id: r.id,
            }
            .encode()
        })
    } else {
        None
    };
    FeedPage {
        items: rows,
        next_cursor,
        has_more,
    }
}
