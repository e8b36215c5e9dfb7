//! The service-token exchange.
//!
//! `POST /auth/service` trades a GCP identity token for a session token:
//! 401 for an invalid token, 403 when the service account is not on the
//! allowlist, 500 when the system user row is missing.

use std::sync::Arc;

use axum::extract::State;
use serde::Deserialize;

use agora_db::UserStore;
use agora_types::UserId;

use crate::auth::{mint_session, verify_identity_token};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /auth/service`.
#[derive(Debug, Deserialize)]
pub struct ServiceAuthRequest {
    /// The GCP identity token to exchange.
    pub token: String,
}

/// `POST /auth/service` -- exchange an identity token for a session.
pub async fn exchange(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<ServiceAuthRequest>,
) -> Result<Envelope<serde_json::Value>, ApiError> {
    let email = verify_identity_token(
        &body.token,
        &state.auth.jwks_url,
        &state.auth.jwt_audience,
    )
    .await?;

    if !state.allowlist.contains(&email).await {
        return Err(ApiError::Forbidden(format!(
            "service account {email} is not on the allowlist"
        )));
    }

    let system = UserStore::new(state.pool.pool())
        .system_user()
        .await?
        .ok_or_else(|| ApiError::Internal("system user row is missing".to_owned()))?;
    let user = UserId::new(&system.id)
        .ok_or_else(|| ApiError::Internal("system user id is malformed".to_owned()))?;

    let token = mint_session(&user, &state.auth.jwt_secret, state.auth.session_ttl_secs)?;
    tracing::info!(%email, "Issued service session");
    Ok(Envelope::ok(serde_json::json!({
        "token": token,
        "user_id": user.as_str(),
    })))
}
