//! Semantic search over the content embeddings.
//!
//! The query is embedded via the discourse engine, then run as an HNSW
//! cosine nearest-neighbor query. Content that was never embedded simply
//! does not appear; an unreachable engine is a dependency failure.

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;

use agora_db::EmbeddingStore;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Maximum search result count.
const MAX_LIMIT: i64 = 50;

/// Default search result count.
const DEFAULT_LIMIT: i64 = 20;

/// Query parameters of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// The query text (required).
    pub q: Option<String>,
    /// Search type; only `semantic` is supported.
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    /// Result count (default 20, max 50).
    pub limit: Option<i64>,
}

/// `GET /search?q=&type=semantic&limit=` -- semantic content search.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Envelope<Vec<agora_db::ContentHit>>, ApiError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::ValidationFailed("q is required".to_owned()))?;

    let search_type = query.search_type.as_deref().unwrap_or("semantic");
    if search_type != "semantic" {
        return Err(ApiError::ValidationFailed(format!(
            "unknown search type {search_type:?}"
        )));
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let embedding = state.discourse.embed_one(q).await?;
    let hits = EmbeddingStore::new(state.pool.pool())
        .search_content(&embedding, limit)
        .await?;
    Ok(Envelope::ok(hits))
}
