//! Legacy V2 argument layer: argument discourse units (ADUs), canonical
//! claims, and pairwise relations.
//!
//! Superseded by the V3 hypergraph but still served read-only by the
//! arguments API. The `adu_count` on canonical claims is maintained by
//! the `canonical_claims_maintain_count` trigger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// A row from the `adus` table (embedding omitted).
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct AduRow {
    /// ADU identifier.
    pub id: Uuid,
    /// Kind of the source content.
    pub source_type: String,
    /// Identifier of the source content.
    pub source_id: Uuid,
    /// The post the ADU was extracted from, when known.
    pub post_id: Option<Uuid>,
    /// claim or premise.
    pub adu_type: String,
    /// Extracted text.
    pub text_content: String,
    /// Span start (inclusive).
    pub span_start: i32,
    /// Span end (exclusive).
    pub span_end: i32,
    /// Extraction confidence.
    pub confidence: Option<f32>,
    /// Canonical claim this ADU deduplicates to, when mapped.
    pub canonical_claim_id: Option<Uuid>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// Columns selected for every ADU read.
const ADU_COLUMNS: &str = "id, source_type, source_id, post_id, adu_type, text_content, \
     span_start, span_end, confidence, canonical_claim_id, created_at";

/// A row from the `canonical_claims` table (embedding omitted).
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ClaimRow {
    /// Claim identifier.
    pub id: Uuid,
    /// Canonical claim text.
    pub text: String,
    /// Number of ADUs mapped to this claim (trigger-maintained).
    pub adu_count: i32,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
}

/// A row from the `adu_relations` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct RelationRow {
    /// Relation identifier.
    pub id: Uuid,
    /// Source ADU.
    pub from_adu_id: Uuid,
    /// Target ADU.
    pub to_adu_id: Uuid,
    /// support or attack.
    pub relation_type: String,
    /// Relation confidence.
    pub confidence: Option<f32>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// A post related to a canonical claim, with a similarity score.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct RelatedPost {
    /// The related post.
    pub post_id: Uuid,
    /// Its title.
    pub title: String,
    /// Cosine similarity between the claim and the mapped ADU.
    pub similarity: Option<f64>,
}

/// Read operations over the legacy argument tables.
pub struct ClaimStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ClaimStore<'a> {
    /// Create a claim store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// ADUs extracted from a post, in span order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn adus_for_post(&self, post_id: Uuid) -> Result<Vec<AduRow>, DbError> {
        let rows = sqlx::query_as::<_, AduRow>(&format!(
            r"SELECT {ADU_COLUMNS} FROM adus
              WHERE post_id = $1
              ORDER BY span_start"
        ))
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Fetch a canonical claim by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the claim does not exist.
    pub async fn get_claim(&self, id: Uuid) -> Result<ClaimRow, DbError> {
        sqlx::query_as::<_, ClaimRow>(
            r"SELECT id, text, adu_count, created_at, updated_at
              FROM canonical_claims WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("canonical claim {id}")))
    }

    /// Relations touching an ADU, in either direction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the ADU does not exist.
    pub async fn relations_for_adu(&self, adu_id: Uuid) -> Result<Vec<RelationRow>, DbError> {
        let exists: Option<(Uuid,)> =
            sqlx::query_as(r"SELECT id FROM adus WHERE id = $1")
                .bind(adu_id)
                .fetch_optional(self.pool)
                .await?;
        if exists.is_none() {
            return Err(DbError::NotFound(format!("adu {adu_id}")));
        }

        let rows = sqlx::query_as::<_, RelationRow>(
            r"SELECT * FROM adu_relations
              WHERE from_adu_id = $1 OR to_adu_id = $1
              ORDER BY created_at",
        )
        .bind(adu_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Posts whose ADUs map to a canonical claim, ranked by embedding
    /// similarity to the claim. `exclude_source_id` drops the asking
    /// post's own rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the claim does not exist.
    pub async fn related_posts(
        &self,
        claim_id: Uuid,
        exclude_source_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<RelatedPost>, DbError> {
        // 404 before an empty result set: the claim must exist.
        self.get_claim(claim_id).await?;

        let rows = sqlx::query_as::<_, RelatedPost>(
            r"SELECT post_id, title, similarity FROM (
                  SELECT DISTINCT ON (p.id)
                         p.id AS post_id,
                         p.title,
                         1 - (a.embedding <=> c.embedding) AS similarity
                  FROM canonical_claims c
                  JOIN adus a ON a.canonical_claim_id = c.id
                  JOIN posts p ON p.id = a.post_id
                  WHERE c.id = $1
                    AND p.deleted_at IS NULL
                    AND ($2::uuid IS NULL OR a.source_id <> $2)
                  ORDER BY p.id, similarity DESC NULLS LAST
              ) best
              ORDER BY similarity DESC NULLS LAST
              LIMIT $3",
        )
        .bind(claim_id)
        .bind(exclude_source_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
