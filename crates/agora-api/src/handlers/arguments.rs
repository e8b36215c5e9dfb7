//! Legacy argument endpoints: ADUs, canonical claims, related posts.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use agora_db::{ClaimStore, ContentStore};

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Maximum related-posts count.
const MAX_RELATED: i64 = 50;

/// Query parameters of `GET /arguments/canonical-claims/:id/related-posts`.
#[derive(Debug, Deserialize)]
pub struct RelatedPostsQuery {
    /// Drop rows originating from this source content.
    pub exclude_source_id: Option<Uuid>,
    /// Result count (default 10, max 50).
    pub limit: Option<i64>,
}

/// `GET /arguments/posts/:id/adus` -- a post's ADUs in span order.
pub async fn adus_for_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> Result<Envelope<Vec<agora_db::AduRow>>, ApiError> {
    // 404 for a missing or deleted post, even with no ADUs.
    ContentStore::new(state.pool.pool()).get_post(post_id).await?;
    let adus = ClaimStore::new(state.pool.pool())
        .adus_for_post(post_id)
        .await?;
    Ok(Envelope::ok(adus))
}

/// `GET /arguments/claims/:id` -- a canonical claim by id.
pub async fn get_claim(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<agora_db::ClaimRow>, ApiError> {
    let claim = ClaimStore::new(state.pool.pool()).get_claim(id).await?;
    Ok(Envelope::ok(claim))
}

/// `GET /arguments/claims/:id/related` -- relations touching an ADU.
pub async fn relations_for_adu(
    State(state): State<Arc<AppState>>,
    Path(adu_id): Path<Uuid>,
) -> Result<Envelope<Vec<agora_db::RelationRow>>, ApiError> {
    let relations = ClaimStore::new(state.pool.pool())
        .relations_for_adu(adu_id)
        .await?;
    Ok(Envelope::ok(relations))
}

/// `GET /arguments/canonical-claims/:id/related-posts` -- posts sharing
/// the claim, with similarity scores.
pub async fn related_posts(
    State(state): State<Arc<AppState>>,
    Path(claim_id): Path<Uuid>,
    Query(query): Query<RelatedPostsQuery>,
) -> Result<Envelope<Vec<agora_db::RelatedPost>>, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, MAX_RELATED);
    let posts = ClaimStore::new(state.pool.pool())
        .related_posts(claim_id, query.exclude_source_id, limit)
        .await?;
    Ok(Envelope::ok(posts))
}
