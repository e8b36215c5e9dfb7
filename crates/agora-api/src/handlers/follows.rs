//! Follow graph endpoints.
//!
//! Follower listings page by `created_at DESC`; the cursor is the
//! ISO-8601 `created_at` of the last row.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use agora_db::FollowStore;
use agora_types::UserId;

use crate::auth::AuthUser;
use crate::envelope::{Envelope, Page};
use crate::error::ApiError;
use crate::state::AppState;

/// Maximum listing page size.
const MAX_LIMIT: i64 = 100;

/// Query parameters of the follower listings.
#[derive(Debug, Deserialize)]
pub struct FollowListQuery {
    /// Page size (default 20, max 100).
    pub limit: Option<i64>,
    /// ISO-8601 `created_at` of the last row on the previous page.
    pub cursor: Option<String>,
}

/// `POST /follows/:id` -- follow a user (idempotent).
pub async fn follow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(target): Path<String>,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    let target = parse_user(&target)?;
    FollowStore::new(state.pool.pool())
        .follow(&user, &target)
        .await?;
    Ok(Envelope::ok(serde_json::json!({ "following": true })))
}

/// `DELETE /follows/:id` -- unfollow a user.
pub async fn unfollow(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(target): Path<String>,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    let target = parse_user(&target)?;
    FollowStore::new(state.pool.pool())
        .unfollow(&user, &target)
        .await?;
    Ok(Envelope::ok(serde_json::json!({ "following": false })))
}

/// `GET /follows/:id/followers` -- who follows this user.
pub async fn list_followers(
    State(state): State<Arc<AppState>>,
    Path(target): Path<String>,
    Query(query): Query<FollowListQuery>,
) -> Result<Envelope<Page<agora_db::FollowEntry>>, ApiError> {
    let target = parse_user(&target)?;
    let (limit, before) = page_params(&query)?;
    let rows = FollowStore::new(state.pool.pool())
        .list_followers(&target, limit.saturating_add(1), before)
        .await?;
    Ok(Envelope::ok(paginate(rows, limit)))
}

/// `GET /follows/:id/following` -- whom this user follows.
pub async fn list_following(
    State(state): State<Arc<AppState>>,
    Path(target): Path<String>,
    Query(query): Query<FollowListQuery>,
) -> Result<Envelope<Page<agora_db::FollowEntry>>, ApiError> {
    let target = parse_user(&target)?;
    let (limit, before) = page_params(&query)?;
    let rows = FollowStore::new(state.pool.pool())
        .list_following(&target, limit.saturating_add(1), before)
        .await?;
    Ok(Envelope::ok(paginate(rows, limit)))
}

fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    UserId::new(raw).ok_or_else(|| ApiError::ValidationFailed("malformed user id".to_owned()))
}

fn page_params(query: &FollowListQuery) -> Result<(i64, Option<DateTime<Utc>>), ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, MAX_LIMIT);
    let before = query
        .cursor
        .as_deref()
        .map(|c| {
            DateTime::parse_from_rfc3339(c)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| ApiError::ValidationFailed("malformed cursor".to_owned()))
        })
        .transpose()?;
    Ok((limit, before))
}

fn paginate(mut rows: Vec<agora_db::FollowEntry>, limit: i64) -> Page<agora_db::FollowEntry> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let cursor = if has_more {
        rows.last().map(|r| r.followed_at.to_rfc3339())
    } else {
        None
    };
    Page {
        items: rows,
        cursor,
        has_more,
    }
}
