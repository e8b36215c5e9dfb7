//! Post and reply endpoints.
//!
//! Creating content also opens an analysis run keyed by the content
//! hash; a conflicting non-terminal run (unchanged content) is ignored.
//! Replies fan a coalescing SOCIAL notification out to the author of the
//! content replied to.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use agora_db::{ContentStore, DbError, NotificationStore, Quote, RunStore, UserStore};
use agora_types::{TargetKind, UserId};

use crate::auth::AuthUser;
use crate::envelope::{Envelope, Page};
use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /posts`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    /// Post title, 1..=300 characters.
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    /// Post body, at most 40 000 characters.
    #[validate(length(max = 40000))]
    pub content: String,
}

/// Body of `POST /posts/:id/replies`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReplyRequest {
    /// Reply body, 1..=10 000 characters.
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    /// Parent reply for nested replies.
    pub parent_reply_id: Option<Uuid>,
    /// Quoted text (all-or-none with the other quote fields).
    #[validate(length(max = 2000))]
    pub quoted_text: Option<String>,
    /// Kind of the quoted source.
    pub quoted_source_type: Option<TargetKind>,
    /// Identifier of the quoted source.
    pub quoted_source_id: Option<Uuid>,
}

/// Query parameters of `GET /posts/:id/replies`.
#[derive(Debug, Deserialize)]
pub struct ListRepliesQuery {
    /// Page size (default 20, max 100).
    pub limit: Option<i64>,
    /// Opaque path cursor from the previous page.
    pub cursor: Option<String>,
}

/// `POST /posts` -- create a post and open its analysis run.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    axum::Json(body): axum::Json<CreatePostRequest>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::ValidationFailed(e.to_string()))?;

    let content = ContentStore::new(state.pool.pool());
    let post = content.create_post(&user, &body.title, &body.content).await?;

    open_run_best_effort(&state, TargetKind::Post, post.id, post.analysis_content_hash.as_deref())
        .await;

    Ok(Envelope::ok(post).with_status(StatusCode::CREATED))
}

/// `GET /posts/:id` -- fetch a post; 404 when missing or soft-deleted.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<agora_db::PostRow>, ApiError> {
    let post = ContentStore::new(state.pool.pool()).get_post(id).await?;
    Ok(Envelope::ok(post))
}

/// `DELETE /posts/:id` -- soft-delete (author or system only).
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    let is_system = actor_is_system(&state, &user).await?;
    ContentStore::new(state.pool.pool())
        .soft_delete(TargetKind::Post, id, &user, is_system)
        .await?;
    Ok(Envelope::ok(serde_json::json!({ "deleted": true })))
}

/// `POST /posts/:id/replies` -- create a reply (optionally nested and
/// quoting) and open its analysis run.
pub async fn create_reply(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<Uuid>,
    axum::Json(body): axum::Json<CreateReplyRequest>,
) -> Result<Response, ApiError> {
    body.validate()
        .map_err(|e| ApiError::ValidationFailed(e.to_string()))?;

    let quote = build_quote(&body)?;
    let content = ContentStore::new(state.pool.pool());
    let reply = content
        .create_reply(
            &user,
            post_id,
            body.parent_reply_id,
            &body.content,
            quote.as_ref(),
        )
        .await?;

    open_run_best_effort(
        &state,
        TargetKind::Reply,
        reply.id,
        reply.analysis_content_hash.as_deref(),
    )
    .await;

    notify_replied_to(&state, &user, post_id, body.parent_reply_id).await;

    Ok(Envelope::ok(reply).with_status(StatusCode::CREATED))
}

/// `GET /posts/:id/replies` -- one page of the thread in path order.
pub async fn list_replies(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<ListRepliesQuery>,
) -> Result<Envelope<Page<agora_db::ReplyRow>>, ApiError> {
    let content = ContentStore::new(state.pool.pool());
    // 404 for a missing or deleted post, even with an empty thread.
    content.get_post(post_id).await?;

    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = content
        .list_replies(post_id, limit, query.cursor.as_deref())
        .await?;
    Ok(Envelope::ok(Page {
        items: page.items,
        cursor: page.next_cursor,
        has_more: page.has_more,
    }))
}

/// `GET /replies/:id` -- fetch a reply; 404 when missing or deleted.
pub async fn get_reply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Envelope<agora_db::ReplyRow>, ApiError> {
    let reply = ContentStore::new(state.pool.pool()).get_reply(id).await?;
    Ok(Envelope::ok(reply))
}

/// `DELETE /replies/:id` -- soft-delete (author or system only).
pub async fn delete_reply(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    let is_system = actor_is_system(&state, &user).await?;
    ContentStore::new(state.pool.pool())
        .soft_delete(TargetKind::Reply, id, &user, is_system)
        .await?;
    Ok(Envelope::ok(serde_json::json!({ "deleted": true })))
}

/// Quote fields are all-or-none; anything partial is a 400.
fn build_quote(body: &CreateReplyRequest) -> Result<Option<Quote>, ApiError> {
    match (
        body.quoted_text.as_ref(),
        body.quoted_source_type,
        body.quoted_source_id,
    ) {
        (None, None, None) => Ok(None),
        (Some(text), Some(source_type), Some(source_id)) => Ok(Some(Quote {
            text: text.clone(),
            source_type,
            source_id,
        })),
        _ => Err(ApiError::ValidationFailed(
            "quote fields are all-or-none".to_owned(),
        )),
    }
}

async fn actor_is_system(state: &Arc<AppState>, user: &UserId) -> Result<bool, ApiError> {
    let row = UserStore::new(state.pool.pool()).get(user).await?;
    Ok(row.is_system)
}

/// Open an analysis run; an existing non-terminal run for the same
/// content is expected and ignored.
async fn open_run_best_effort(
    state: &Arc<AppState>,
    source_type: TargetKind,
    source_id: Uuid,
    content_hash: Option<&str>,
) {
    let Some(hash) = content_hash else { return };
    let runs = RunStore::new(state.pool.pool());
    match runs.open(source_type, source_id, hash).await {
        Ok(run) => tracing::debug!(run_id = %run.id, "Opened analysis run"),
        Err(DbError::Conflict(_)) => {}
        Err(e) => tracing::warn!(error = %e, "Could not open analysis run"),
    }
}

/// Coalescing SOCIAL notification to whoever authored the content that
/// was replied to. Self-replies notify nobody.
async fn notify_replied_to(
    state: &Arc<AppState>,
    replier: &UserId,
    post_id: Uuid,
    parent_reply_id: Option<Uuid>,
) {
    let content = ContentStore::new(state.pool.pool());
    let (recipient_id, target_type, target_id) = match parent_reply_id {
        Some(parent_id) => match content.get_reply(parent_id).await {
            Ok(parent) => (parent.author_id, TargetKind::Reply, parent.id),
            Err(_) => return,
        },
        None => match content.get_post(post_id).await {
            Ok(post) => (post.author_id, TargetKind::Post, post.id),
            Err(_) => return,
        },
    };

    if recipient_id == replier.as_str() {
        return;
    }
    let Some(recipient) = UserId::new(&recipient_id) else {
        return;
    };

    let notifications = NotificationStore::new(state.pool.pool());
    if let Err(e) = notifications
        .record_reply(&recipient, target_type, target_id, replier)
        .await
    {
        tracing::warn!(error = %e, "Could not record reply notification");
    }
}
