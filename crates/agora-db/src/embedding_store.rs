//! Semantic search queries over the HNSW-indexed embedding tables.
//!
//! Cosine distance (`<=>`) drives every ranking; similarity is reported
//! as `1 - distance`. Content rows whose post or reply has been
//! soft-deleted are filtered out during hydration. A query against an
//! empty table simply returns no rows.

use sqlx::PgPool;
use uuid::Uuid;

use agora_types::TargetKind;

use crate::error::DbError;
use crate::vector;

/// A hydrated content search hit.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ContentHit {
    /// post or reply.
    pub target_type: String,
    /// Identifier of the matching content.
    pub target_id: Uuid,
    /// Post title (posts only).
    pub title: Option<String>,
    /// The matching content's body.
    pub content: String,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f64,
}

/// A raw nearest-neighbor hit against a node-level embedding table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct VectorHit {
    /// Identifier of the matching row.
    pub id: Uuid,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f64,
}

/// Operations on the embedding tables.
pub struct EmbeddingStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EmbeddingStore<'a> {
    /// Create an embedding store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the embedding of a piece of content.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert_content(
        &self,
        source_type: TargetKind,
        source_id: Uuid,
        embedding: &[f32],
    ) -> Result<(), DbError> {
        let literal = vector::encode(embedding);
        sqlx::query(
            r"INSERT INTO content_embeddings (source_type, source_id, embedding)
              VALUES ($1, $2, $3::vector)
              ON CONFLICT (source_type, source_id)
              DO UPDATE SET embedding = EXCLUDED.embedding",
        )
        .bind(source_type.as_str())
        .bind(source_id)
        .bind(&literal)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Nearest content to a query embedding, hydrated into posts and
    /// replies, most similar first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn search_content(
        &self,
        query: &[f32],
        limit: i64,
    ) -> Result<Vec<ContentHit>, DbError> {
        let literal = vector::encode(query);
        let rows = sqlx::query_as::<_, ContentHit>(
            r"SELECT ce.source_type AS target_type,
                     ce.source_id AS target_id,
                     p.title AS title,
                     COALESCE(p.content, r.content) AS content,
                     1 - (ce.embedding <=> $1::vector) AS similarity
              FROM content_embeddings ce
              LEFT JOIN posts p
                   ON ce.source_type = 'post'
                  AND p.id = ce.source_id
                  AND p.deleted_at IS NULL
              LEFT JOIN replies r
                   ON ce.source_type = 'reply'
                  AND r.id = ce.source_id
                  AND r.deleted_at IS NULL
              WHERE COALESCE(p.id, r.id) IS NOT NULL
              ORDER BY ce.embedding <=> $1::vector
              LIMIT $2",
        )
        .bind(&literal)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Nearest information nodes to a query embedding.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn search_inodes(
        &self,
        query: &[f32],
        limit: i64,
    ) -> Result<Vec<VectorHit>, DbError> {
        self.search_table("information_nodes", query, limit).await
    }

    /// Nearest concept nodes to a query embedding.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn search_concepts(
        &self,
        query: &[f32],
        limit: i64,
    ) -> Result<Vec<VectorHit>, DbError> {
        self.search_table("concept_nodes", query, limit).await
    }

    /// Nearest sources to a query embedding.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn search_sources(
        &self,
        query: &[f32],
        limit: i64,
    ) -> Result<Vec<VectorHit>, DbError> {
        self.search_table("sources", query, limit).await
    }

    async fn search_table(
        &self,
        table: &str,
        query: &[f32],
        limit: i64,
    ) -> Result<Vec<VectorHit>, DbError> {
        let literal = vector::encode(query);
        let rows = sqlx::query_as::<_, VectorHit>(&format!(
            r"SELECT id, 1 - (embedding <=> $1::vector) AS similarity
              FROM {table}
              WHERE embedding IS NOT NULL
              ORDER BY embedding <=> $1::vector
              LIMIT $2"
        ))
        .bind(&literal)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
