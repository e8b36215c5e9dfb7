//! Vote endpoints: idempotent upsert and rescind.

use std::sync::Arc;

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use agora_db::VoteStore;
use agora_types::TargetKind;

use crate::auth::AuthUser;
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /votes` and `DELETE /votes`.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// Kind of the voted target.
    pub target_type: TargetKind,
    /// Identifier of the voted target.
    pub target_id: Uuid,
    /// +1 or -1; ignored on DELETE.
    pub value: Option<i16>,
}

/// `POST /votes` -- cast or update a vote.
///
/// Re-casting the same value is a no-op; flipping direction moves the
/// score by 2 and leaves the vote count unchanged.
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    axum::Json(body): axum::Json<VoteRequest>,
) -> Result<Envelope<agora_db::VoteRow>, ApiError> {
    let value = body
        .value
        .ok_or_else(|| ApiError::ValidationFailed("value is required".to_owned()))?;
    let vote = VoteStore::new(state.pool.pool())
        .cast(&user, body.target_type, body.target_id, value)
        .await?;
    Ok(Envelope::ok(vote))
}

/// `DELETE /votes` -- remove the caller's vote from a target.
pub async fn rescind_vote(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    axum::Json(body): axum::Json<VoteRequest>,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    VoteStore::new(state.pool.pool())
        .rescind(&user, body.target_type, body.target_id)
        .await?;
    Ok(Envelope::ok(serde_json::json!({ "removed": true })))
}
