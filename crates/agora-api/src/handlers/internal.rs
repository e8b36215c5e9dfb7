//! Hidden internal endpoints behind the `x-internal-secret` header.
//!
//! A missing or wrong secret yields 404, not 401: the routes do not
//! exist for unauthorized callers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;

use crate::caches::{DEFAULT_BLOCK_TTL_SECS, MAX_BLOCK_TTL_SECS, MIN_BLOCK_TTL_SECS};
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the internal shared secret.
const SECRET_HEADER: &str = "x-internal-secret";

/// Body of `POST /internal/block-ip`.
#[derive(Debug, Deserialize)]
pub struct BlockIpRequest {
    /// The address to block.
    pub ip: String,
    /// Block duration in seconds, 1..=2 592 000 (default 3600).
    #[serde(rename = "ttlSeconds")]
    pub ttl_seconds: Option<u64>,
}

/// `POST /internal/block-ip` -- add an address to the blocklist.
pub async fn block_ip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<BlockIpRequest>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    guard(&state, &headers)?;

    let ttl = body.ttl_seconds.unwrap_or(DEFAULT_BLOCK_TTL_SECS);
    if !(MIN_BLOCK_TTL_SECS..=MAX_BLOCK_TTL_SECS).contains(&ttl) {
        return Err(ApiError::ValidationFailed(format!(
            "ttlSeconds must be {MIN_BLOCK_TTL_SECS}..={MAX_BLOCK_TTL_SECS}"
        )));
    }
    let ip = body.ip.trim();
    if ip.is_empty() {
        return Err(ApiError::ValidationFailed("ip is required".to_owned()));
    }

    state
        .blocklist
        .block(ip, Duration::from_secs(ttl))
        .await;
    tracing::info!(ip, ttl, "Blocked address");
    Ok(axum::Json(serde_json::json!({ "ok": true })))
}

/// `GET /internal/blocked-ips` -- the currently blocked addresses.
pub async fn blocked_ips(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    guard(&state, &headers)?;
    let ips = state.blocklist.list().await;
    Ok(axum::Json(serde_json::json!({ "ips": ips })))
}

/// 404 on a missing or wrong secret -- the routes are hidden.
fn guard(state: &Arc<AppState>, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if state.internal_secret.is_empty() || presented != state.internal_secret {
        return Err(ApiError::NotFound("not found".to_owned()));
    }
    Ok(())
}
