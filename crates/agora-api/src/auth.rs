//! Bearer-token authentication.
//!
//! Two token kinds flow through here:
//!
//! - **Session tokens** (HS256, our secret): minted by the service
//!   exchange and validated on every authenticated route via the
//!   [`AuthUser`] extractor.
//! - **Identity tokens** (RS256, external issuer): presented to
//!   `POST /auth/service`, verified against the configured JWKS and
//!   audience, then exchanged for a session token if the account is on
//!   the allowlist.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use agora_types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The authenticated user id.
    pub sub: String,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Issued-at (unix seconds).
    pub iat: i64,
}

/// Claims read from an external identity token.
#[derive(Debug, Deserialize)]
pub struct IdentityClaims {
    /// The service account email.
    pub email: String,
}

/// Mint a session token for a user.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if signing fails.
pub fn mint_session(user: &UserId, secret: &str, ttl_secs: u64) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user.as_str().to_owned(),
        exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("session signing failed: {e}")))
}

/// Validate a session token and return the user id.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] on any validation failure.
pub fn verify_session(token: &str, secret: &str) -> Result<UserId, ApiError> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ApiError::Unauthorized(format!("invalid session token: {e}")))?;
    UserId::new(&data.claims.sub)
        .ok_or_else(|| ApiError::Unauthorized("malformed session subject".to_owned()))
}

/// One key from a JWKS document.
#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    n: String,
    e: String,
}

/// A JWKS document.
#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

/// Verify an external identity token: signature against the JWKS,
/// audience against the configured value. Returns the account email.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] on any verification failure and
/// [`ApiError::DependencyFailed`] when the JWKS cannot be fetched.
pub async fn verify_identity_token(
    token: &str,
    jwks_url: &str,
    audience: &str,
) -> Result<String, ApiError> {
    let header = decode_header(token)
        .map_err(|e| ApiError::Unauthorized(format!("malformed identity token: {e}")))?;

    let jwks: Jwks = reqwest::get(jwks_url)
        .await
        .map_err(|e| ApiError::DependencyFailed(format!("JWKS fetch failed: {e}")))?
        .json()
        .await
        .map_err(|e| ApiError::DependencyFailed(format!("JWKS parse failed: {e}")))?;

    let key = jwks
        .keys
        .iter()
        .find(|k| k.kid == header.kid)
        .or_else(|| jwks.keys.first())
        .ok_or_else(|| ApiError::Unauthorized("no JWKS key matches token".to_owned()))?;

    let decoding_key = DecodingKey::from_rsa_components(&key.n, &key.e)
        .map_err(|e| ApiError::Unauthorized(format!("bad JWKS key material: {e}")))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);

    let data = decode::<IdentityClaims>(token, &decoding_key, &validation)
        .map_err(|e| ApiError::Unauthorized(format!("identity token rejected: {e}")))?;
    Ok(data.claims.email)
}

/// Extractor for the authenticated user on protected routes.
///
/// Reads `Authorization: Bearer <session token>`.
pub struct AuthUser(pub UserId);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_owned()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_owned()))?;
        let user = verify_session(token, &state.auth.jwt_secret)?;
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn session_roundtrip() {
        let user = UserId::new("alice").expect("valid id");
        let token = mint_session(&user, "test-secret", 3600).expect("mint");
        let verified = verify_session(&token, "test-secret").expect("verify");
        assert_eq!(verified, user);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let user = UserId::new("alice").expect("valid id");
        let token = mint_session(&user, "test-secret", 3600).expect("mint");
        assert!(verify_session(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_session_is_rejected() {
        let user = UserId::new("alice").expect("valid id");
        let token = mint_session(&user, "test-secret", 0).expect("mint");
        // Default validation enforces exp with zero leeway disabled, so
        // an already-expired token must fail.
        let mut validation = Validation::default();
        validation.leeway = 0;
        let result = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret("test-secret".as_bytes()),
            &validation,
        );
        assert!(result.is_err());
    }
}
