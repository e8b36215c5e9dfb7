//! The pull-only notification inbox.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use agora_db::NotificationStore;
use agora_types::NotificationCategory;

use crate::auth::AuthUser;
use crate::envelope::{Envelope, Page};
use crate::error::ApiError;
use crate::state::AppState;

/// Maximum inbox page size.
const MAX_LIMIT: i64 = 100;

/// Query parameters of `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    /// SOCIAL or EPISTEMIC (default SOCIAL).
    pub category: Option<String>,
    /// Page size (default 20, max 100).
    pub limit: Option<i64>,
    /// ISO-8601 `updated_at` of the last row on the previous page.
    pub cursor: Option<String>,
}

/// `GET /notifications` -- one inbox page, most recent first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<InboxQuery>,
) -> Result<Envelope<Page<agora_db::NotificationRow>>, ApiError> {
    let category_name = query.category.as_deref().unwrap_or("SOCIAL");
    let category = NotificationCategory::parse(category_name).ok_or_else(|| {
        ApiError::ValidationFailed(format!("unknown category {category_name:?}"))
    })?;
    let limit = query.limit.unwrap_or(20).clamp(1, MAX_LIMIT);
    let before: Option<DateTime<Utc>> = query
        .cursor
        .as_deref()
        .map(|c| {
            DateTime::parse_from_rfc3339(c)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| ApiError::ValidationFailed("malformed cursor".to_owned()))
        })
        .transpose()?;

    let store = NotificationStore::new(state.pool.pool());
    let mut rows = store
        .list(&user, category, limit.saturating_add(1), before)
        .await?;

    let limit_usize = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > limit_usize;
    rows.truncate(limit_usize);
    let cursor = if has_more {
        rows.last().map(|r| r.updated_at.to_rfc3339())
    } else {
        None
    };
    Ok(Envelope::ok(Page {
        items: rows,
        cursor,
        has_more,
    }))
}

/// `POST /notifications/viewed` -- stamp the SOCIAL inbox as seen.
pub async fn mark_viewed(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    NotificationStore::new(state.pool.pool())
        .touch_last_viewed(&user)
        .await?;
    Ok(Envelope::ok(serde_json::json!({ "viewed": true })))
}

/// `POST /notifications/:id/read` -- mark one EPISTEMIC row read.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    NotificationStore::new(state.pool.pool())
        .mark_read(&user, id)
        .await?;
    Ok(Envelope::ok(serde_json::json!({ "read": true })))
}
