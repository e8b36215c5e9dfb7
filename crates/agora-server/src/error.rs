//! Error types for the server binary.

/// Errors that can occur during startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// A required environment variable is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The database could not be reached or migrated.
    #[error("database error: {0}")]
    Db(#[from] agora_db::DbError),

    /// The karma schedule could not be parsed.
    #[error("analysis error: {0}")]
    Analysis(#[from] agora_analysis::AnalysisError),

    /// The HTTP server failed to start.
    #[error("server error: {0}")]
    Server(#[from] agora_api::ServerError),
}
