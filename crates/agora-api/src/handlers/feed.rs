//! The ranked feed endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;

use agora_db::FeedRanker;
use agora_types::FeedSort;

use crate::envelope::{Envelope, Page};
use crate::error::ApiError;
use crate::state::AppState;

/// Maximum feed page size.
const MAX_LIMIT: i64 = 100;

/// Default feed page size.
const DEFAULT_LIMIT: i64 = 20;

/// Query parameters of `GET /feed`.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// hot / new / top / rising / controversial (default hot).
    pub sort: Option<String>,
    /// Page size (default 20, max 100).
    pub limit: Option<i64>,
    /// Opaque cursor from the previous page.
    pub cursor: Option<String>,
}

/// `GET /feed?sort=&limit=&cursor=` -- one ranked page of posts.
pub async fn feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Envelope<Page<agora_db::PostRow>>, ApiError> {
    let sort_name = query.sort.as_deref().unwrap_or("hot");
    let sort = FeedSort::parse(sort_name)
        .ok_or_else(|| ApiError::ValidationFailed(format!("unknown sort {sort_name:?}")))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let page = FeedRanker::new(state.pool.pool())
        .page(sort, limit, query.cursor.as_deref())
        .await?;
    Ok(Envelope::ok(Page {
        items: page.items,
        cursor: page.next_cursor,
        has_more: page.has_more,
    }))
}
