//! Error types for the discourse engine client.

/// Errors that can occur talking to the discourse engine.
#[derive(Debug, thiserror::Error)]
pub enum DiscourseError {
    /// The HTTP request failed (connect, timeout, TLS).
    #[error("discourse engine unreachable: {0}")]
    Transport(String),

    /// The engine answered with a non-success status.
    #[error("discourse engine returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body could not be parsed into the expected shape.
    #[error("discourse engine response malformed: {0}")]
    Malformed(String),

    /// The engine returned a different number of embeddings than texts.
    #[error("embedding count mismatch: sent {sent}, received {received}")]
    EmbeddingMismatch {
        /// Number of texts submitted.
        sent: usize,
        /// Number of embeddings returned.
        received: usize,
    },
}
