//! Shared application state for the API server.
//!
//! [`AppState`] is wrapped in [`Arc`] and injected via Axum's `State`
//! extractor. It holds the process-wide database pool, the discourse
//! engine client, the in-memory caches, and the auth settings.

use std::sync::Arc;

use agora_db::PostgresPool;
use agora_discourse::DiscourseClient;

use crate::caches::{AllowlistCache, IpBlocklist};

/// Authentication settings for session tokens and the service exchange.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// HS256 secret for session tokens.
    pub jwt_secret: String,
    /// Expected audience of incoming identity tokens.
    pub jwt_audience: String,
    /// JWKS endpoint used to verify identity-token signatures.
    pub jwks_url: String,
    /// Session token lifetime in seconds.
    pub session_ttl_secs: u64,
}

/// Shared state for the Axum application.
pub struct AppState {
    /// Process-wide `PostgreSQL` pool.
    pub pool: PostgresPool,
    /// Discourse engine client (search embeddings).
    pub discourse: DiscourseClient,
    /// Service-account allowlist (periodically refreshed).
    pub allowlist: AllowlistCache,
    /// TTL-bounded IP blocklist.
    pub blocklist: IpBlocklist,
    /// Auth settings.
    pub auth: AuthSettings,
    /// Shared secret guarding `/internal/*`.
    pub internal_secret: String,
}

impl AppState {
    /// Assemble the state and wrap it for the router.
    pub fn shared(
        pool: PostgresPool,
        discourse: DiscourseClient,
        allowlist: AllowlistCache,
        auth: AuthSettings,
        internal_secret: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            discourse,
            allowlist,
            blocklist: IpBlocklist::new(),
            auth,
            internal_secret,
        })
    }
}
