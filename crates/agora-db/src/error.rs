//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`]. Constraint violations that
//! callers are expected to handle (duplicate non-terminal runs, missing
//! targets, validation failures) get their own variants so the HTTP layer
//! can map them to the right status codes without inspecting SQLSTATE.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested row does not exist or is soft-deleted.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input violated a shape, length, or enum constraint.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A unique constraint rejected the write and no upsert applies.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor is authenticated but not allowed to perform the write.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A stored value could not be decoded into its domain type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether the underlying failure is a unique-constraint violation.
    ///
    /// Used by writers that turn specific duplicate-key failures into
    /// [`DbError::Conflict`] while letting everything else propagate.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Postgres(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }

    /// Whether the underlying failure is a serialization failure that a
    /// single retry may resolve.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            Self::Postgres(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("40001")
            }
            _ => false,
        }
    }
}
