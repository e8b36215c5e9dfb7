//! Content store: posts and threaded replies.
//!
//! Replies are threaded with a materialized path: every reply's `path` is
//! the ordered sequence of hyphen-stripped uuid labels from the thread
//! root down to itself, so subtree and ancestor queries are prefix
//! queries. Re-parenting is unsupported by design.
//!
//! Content is append-only aside from soft-delete; reply counters are
//! maintained by database triggers, never written here.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use agora_types::{TargetKind, UserId};

use crate::error::DbError;
use crate::hash;

/// Maximum post title length in characters.
pub const MAX_TITLE_LEN: usize = 300;

/// Maximum post content length in characters.
pub const MAX_POST_CONTENT_LEN: usize = 40_000;

/// Maximum reply content length in characters.
pub const MAX_REPLY_CONTENT_LEN: usize = 10_000;

/// Maximum quoted text length in characters.
pub const MAX_QUOTE_LEN: usize = 2_000;

/// Convert a uuid into its `ltree` label form (hyphens become underscores).
pub fn label(id: Uuid) -> String {
    id.to_string().replace('-', "_")
}

/// Quote provenance attached to a reply. All three fields travel together
/// (the all-or-none invariant); a quote-less reply carries `None` upstream.
#[derive(Debug, Clone)]
pub struct Quote {
    /// The quoted text, at most [`MAX_QUOTE_LEN`] characters.
    pub text: String,
    /// Kind of the quoted source.
    pub source_type: TargetKind,
    /// Identifier of the quoted source.
    pub source_id: Uuid,
}

/// A row from the `posts` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PostRow {
    /// Post identifier.
    pub id: Uuid,
    /// Author user id.
    pub author_id: String,
    /// Title (1..=300 characters).
    pub title: String,
    /// Body (at most 40 000 characters).
    pub content: String,
    /// Hex sha-256 over the normalized title + content.
    pub analysis_content_hash: Option<String>,
    /// Sum of vote values (trigger-maintained).
    pub score: i32,
    /// Number of votes (trigger-maintained).
    pub vote_count: i32,
    /// Number of replies anywhere in the thread (trigger-maintained).
    pub reply_count: i32,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant (trigger-maintained).
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A row from the `replies` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ReplyRow {
    /// Reply identifier.
    pub id: Uuid,
    /// The post this reply belongs to.
    pub post_id: Uuid,
    /// Direct parent reply, when nested.
    pub parent_reply_id: Option<Uuid>,
    /// Author user id.
    pub author_id: String,
    /// Body (at most 10 000 characters).
    pub content: String,
    /// 0-based nesting depth.
    pub depth: i32,
    /// Materialized path (`ltree` text form).
    pub path: String,
    /// Quoted text, when quoting.
    pub quoted_text: Option<String>,
    /// Kind of the quoted source, when quoting.
    pub quoted_source_type: Option<String>,
    /// Identifier of the quoted source, when quoting.
    pub quoted_source_id: Option<Uuid>,
    /// Hex sha-256 over the normalized content.
    pub analysis_content_hash: Option<String>,
    /// Sum of vote values (trigger-maintained).
    pub score: i32,
    /// Number of votes (trigger-maintained).
    pub vote_count: i32,
    /// Number of non-deleted direct children (trigger-maintained).
    pub reply_count: i32,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant (trigger-maintained).
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Columns selected for every reply read (`path` cast to text).
const REPLY_COLUMNS: &str = "id, post_id, parent_reply_id, author_id, content, depth, \
     path::TEXT AS path, quoted_text, quoted_source_type, quoted_source_id, \
     analysis_content_hash, score, vote_count, reply_count, \
     created_at, updated_at, deleted_at";

/// One page of replies in thread (path-lexicographic) order.
#[derive(Debug, Clone)]
pub struct ReplyPage {
    /// The page rows.
    pub items: Vec<ReplyRow>,
    /// Path of the last row, to be passed back as the next cursor.
    pub next_cursor: Option<String>,
    /// Whether more rows exist past this page.
    pub has_more: bool,
}

/// Operations on the `posts` and `replies` tables.
pub struct ContentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentStore<'a> {
    /// Create a content store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a post.
    ///
    /// Computes the analysis content hash before insert.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] for out-of-range title or content.
    pub async fn create_post(
        &self,
        author: &UserId,
        title: &str,
        content: &str,
    ) -> Result<PostRow, DbError> {
        let title_len = title.chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(DbError::Validation(format!(
                "title must be 1..={MAX_TITLE_LEN} characters"
            )));
        }
        if content.chars().count() > MAX_POST_CONTENT_LEN {
            return Err(DbError::Validation(format!(
                "content must be at most {MAX_POST_CONTENT_LEN} characters"
            )));
        }

        let content_hash = hash::post_content_hash(title, content);
        let row = sqlx::query_as::<_, PostRow>(
            r"INSERT INTO posts (author_id, title, content, analysis_content_hash)
              VALUES ($1, $2, $3, $4)
              RETURNING *",
        )
        .bind(author.as_str())
        .bind(title)
        .bind(content)
        .bind(&content_hash)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(post_id = %row.id, author = %author, "Created post");
        Ok(row)
    }

    /// Fetch a post by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the post is missing or soft-deleted.
    pub async fn get_post(&self, id: Uuid) -> Result<PostRow, DbError> {
        sqlx::query_as::<_, PostRow>(
            r"SELECT * FROM posts WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("post {id}")))
    }

    /// Create a reply, optionally nested under a parent reply and
    /// optionally carrying quote provenance.
    ///
    /// The reply id is generated app-side so the materialized path can be
    /// built before insert: `path = parent.path . label(id)` for nested
    /// replies, `label(id)` alone at the thread root.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the post (or parent) is missing or
    /// deleted, and [`DbError::Validation`] for length violations or a
    /// parent belonging to a different post.
    pub async fn create_reply(
        &self,
        author: &UserId,
        post_id: Uuid,
        parent_reply_id: Option<Uuid>,
        content: &str,
        quote: Option<&Quote>,
    ) -> Result<ReplyRow, DbError> {
        let content_len = content.chars().count();
        if content_len == 0 || content_len > MAX_REPLY_CONTENT_LEN {
            return Err(DbError::Validation(format!(
                "content must be 1..={MAX_REPLY_CONTENT_LEN} characters"
            )));
        }
        if let Some(q) = quote {
            if q.text.is_empty() || q.text.chars().count() > MAX_QUOTE_LEN {
                return Err(DbError::Validation(format!(
                    "quoted_text must be 1..={MAX_QUOTE_LEN} characters"
                )));
            }
        }

        let mut tx = self.pool.begin().await?;

        let post_exists: Option<(Uuid,)> = sqlx::query_as(
            r"SELECT id FROM posts WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
        if post_exists.is_none() {
            return Err(DbError::NotFound(format!("post {post_id}")));
        }

        let id = Uuid::new_v4();
        let (depth, path) = match parent_reply_id {
            Some(parent_id) => {
                let parent: Option<(Uuid, i32, String)> = sqlx::query_as(
                    r"SELECT post_id, depth, path::TEXT
                      FROM replies WHERE id = $1 AND deleted_at IS NULL",
                )
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?;
                let (parent_post, parent_depth, parent_path) = parent
                    .ok_or_else(|| DbError::NotFound(format!("reply {parent_id}")))?;
                if parent_post != post_id {
                    return Err(DbError::Validation(
                        "parent reply belongs to a different post".to_owned(),
                    ));
                }
                (
                    parent_depth.saturating_add(1),
                    format!("{parent_path}.{}", label(id)),
                )
            }
            None => (0, label(id)),
        };

        let content_hash = hash::reply_content_hash(content);
        let row = sqlx::query_as::<_, ReplyRow>(&format!(
            r"INSERT INTO replies
                  (id, post_id, parent_reply_id, author_id, content, depth, path,
                   quoted_text, quoted_source_type, quoted_source_id,
                   analysis_content_hash)
              VALUES ($1, $2, $3, $4, $5, $6, $7::ltree, $8, $9, $10, $11)
              RETURNING {REPLY_COLUMNS}"
        ))
        .bind(id)
        .bind(post_id)
        .bind(parent_reply_id)
        .bind(author.as_str())
        .bind(content)
        .bind(depth)
        .bind(&path)
        .bind(quote.map(|q| q.text.as_str()))
        .bind(quote.map(|q| q.source_type.as_str()))
        .bind(quote.map(|q| q.source_id))
        .bind(&content_hash)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(reply_id = %row.id, post_id = %post_id, depth, "Created reply");
        Ok(row)
    }

    /// Fetch a reply by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the reply is missing or soft-deleted.
    pub async fn get_reply(&self, id: Uuid) -> Result<ReplyRow, DbError> {
        sqlx::query_as::<_, ReplyRow>(&format!(
            r"SELECT {REPLY_COLUMNS} FROM replies
              WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("reply {id}")))
    }

    /// List a post's replies in thread order (path-lexicographic).
    ///
    /// Keyset pagination: `after_path` is the `path` of the last row of
    /// the previous page. Soft-deleted replies are included as tombstones
    /// so threads keep their shape, with content and quotes blanked.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_replies(
        &self,
        post_id: Uuid,
        limit: i64,
        after_path: Option<&str>,
    ) -> Result<ReplyPage, DbError> {
        let overfetch = limit.saturating_add(1);
        let mut rows = match after_path {
            Some(cursor) => {
                sqlx::query_as::<_, ReplyRow>(&format!(
                    r"SELECT {REPLY_COLUMNS} FROM replies
                      WHERE post_id = $1 AND path > $2::ltree
                      ORDER BY path
                      LIMIT $3"
                ))
                .bind(post_id)
                .bind(cursor)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ReplyRow>(&format!(
                    r"SELECT {REPLY_COLUMNS} FROM replies
                      WHERE post_id = $1
                      ORDER BY path
                      LIMIT $2"
                ))
                .bind(post_id)
                .bind(overfetch)
                .fetch_all(self.pool)
                .await?
            }
        };

        for row in &mut rows {
            if row.deleted_at.is_some() {
                row.content = String::new();
                row.quoted_text = None;
                row.quoted_source_type = None;
                row.quoted_source_id = None;
            }
        }

        Ok(paginate_by_path(rows, limit))
    }

    /// Soft-delete a post or reply.
    ///
    /// Only the author or a system account may delete. Counters are left
    /// untouched: tombstones preserve thread integrity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the target is missing or already
    /// deleted, and [`DbError::Forbidden`] for any other actor.
    pub async fn soft_delete(
        &self,
        kind: TargetKind,
        id: Uuid,
        actor: &UserId,
        actor_is_system: bool,
    ) -> Result<(), DbError> {
        let table = match kind {
            TargetKind::Post => "posts",
            TargetKind::Reply => "replies",
        };

        let author: Option<(String,)> = sqlx::query_as(&format!(
            r"SELECT author_id FROM {table} WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        let (author_id,) =
            author.ok_or_else(|| DbError::NotFound(format!("{} {id}", kind.as_str())))?;

        if author_id != actor.as_str() && !actor_is_system {
            return Err(DbError::Forbidden(
                "only the author or a system account may delete".to_owned(),
            ));
        }

        sqlx::query(&format!(
            r"UPDATE {table} SET deleted_at = now()
              WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .execute(self.pool)
        .await?;

        tracing::debug!(target = %id, kind = kind.as_str(), actor = %actor, "Soft-deleted content");
        Ok(())
    }
}

/// Trim an overfetched row set down to one page with cursor metadata.
fn paginate_by_path(mut rows: Vec<ReplyRow>, limit: i64) -> ReplyPage {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let next_cursor = if has_more {
        rows.last().map(|r| r.path.clone())
    } else {
        None
    };
    ReplyPage {
        items: rows,
        next_cursor,
        has_more,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_strips_hyphens() {
        let id: Uuid = "550e8400-e29b-41d4-a716-446655440000"
            .parse()
            .unwrap_or_default();
        assert_eq!(label(id), "550e8400_e29b_41d4_a716_446655440000");
        assert!(!label(id).contains('-'));
    }

    fn reply_row(path: &str) -> ReplyRow {
        ReplyRow {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            parent_reply_id: None,
            author_id: "alice".to_owned(),
            content: "c".to_owned(),
            depth: 0,
            path: path.to_owned(),
            quoted_text: None,
            quoted_source_type: None,
            quoted_source_id: None,
            analysis_content_hash: None,
            score: 0,
            vote_count: 0,
            reply_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn pagination_truncates_and_sets_cursor() {
        let rows = vec![reply_row("a"), reply_row("b"), reply_row("c")];
        let page = paginate_by_path(rows, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("b"));
    }

    #[test]
    fn pagination_last_page_has_no_cursor() {
        let rows = vec![reply_row("a")];
        let page = paginate_by_path(rows, 2);
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }
}
