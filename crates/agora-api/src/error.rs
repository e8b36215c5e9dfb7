//! Error types for the HTTP API layer.
//!
//! [`ApiError`] carries the machine-readable error kinds of the public
//! contract and converts into the standard response envelope via its
//! [`IntoResponse`] implementation. Typed store errors map onto these
//! kinds; internal details are logged, never leaked.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use agora_db::DbError;
use agora_discourse::DiscourseError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Shape, length, or enum constraint violated.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Missing or invalid session.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but disallowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Missing or soft-deleted target; also hides `/internal/*`.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate unique key not resolvable by upsert.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Action-specific limiter exceeded.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The discourse engine or object storage is unreachable.
    #[error("dependency failed: {0}")]
    DependencyFailed(String),

    /// Unexpected invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The machine-readable error kind for the envelope.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "ValidationFailed",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::RateLimited(_) => "RateLimited",
            Self::DependencyFailed(_) => "DependencyFailed",
            Self::Internal(_) => "InternalError",
        }
    }

    /// The HTTP status for this kind.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::DependencyFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal details are logged, not leaked.
            Self::Internal(detail) => {
                tracing::error!(detail, "Internal error");
                "internal error".to_owned()
            }
            other => other.to_string(),
        };
        let body = serde_json::json!({
            "success": false,
            "error": self.kind(),
            "message": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => Self::NotFound(what),
            DbError::Validation(what) => Self::ValidationFailed(what),
            DbError::Conflict(what) => Self::Conflict(what),
            DbError::Forbidden(what) => Self::Forbidden(what),
            DbError::Postgres(_)
            | DbError::Migration(_)
            | DbError::Serialization(_)
            | DbError::Decode(_)
            | DbError::Config(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<DiscourseError> for ApiError {
    fn from(e: DiscourseError) -> Self {
        Self::DependencyFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(
            ApiError::ValidationFailed(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound(String::new()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::DependencyFailed(String::new()).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn db_errors_map_to_api_kinds() {
        let e: ApiError = DbError::NotFound("post x".to_owned()).into();
        assert_eq!(e.kind(), "NotFound");
        let e: ApiError = DbError::Conflict("run".to_owned()).into();
        assert_eq!(e.kind(), "Conflict");
        let e: ApiError = DbError::Validation("title".to_owned()).into();
        assert_eq!(e.kind(), "ValidationFailed");
    }
}
