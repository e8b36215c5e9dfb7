//! Server configuration loaded from environment variables.
//!
//! Required variables:
//! - `DATABASE_URL` -- `PostgreSQL` connection string
//!
//! Optional variables:
//! - `DISCOURSE_ENGINE_URL` -- discourse engine base URL
//!   (default `http://localhost:9000`)
//! - `HOST` / `PORT` -- bind address (default `0.0.0.0:8080`)
//! - `INTERNAL_SECRET` -- header value guarding `/internal/*`
//!   (empty disables the routes)
//! - `JWT_SECRET` -- HS256 secret for session tokens (required)
//! - `JWT_AUDIENCE` -- expected identity-token audience (default `agora`)
//! - `SERVICE_JWKS_URL` -- JWKS endpoint for identity-token verification
//! - `SERVICE_ALLOWLIST` -- comma-separated service account emails
//! - `SESSION_TTL_SECS` -- session token lifetime (default 86400)
//! - `EMBEDDING_DIMENSION` -- must equal 1536 (schema dimension)
//! - `STALENESS_THRESHOLD_SECS` -- stuck-run threshold (default 3600)
//! - `KARMA_BATCH_SCHEDULE` -- cron expression (default nightly 03:00 UTC)
//! - `CHECKPOINT_DIR` -- checkpoint blob directory (default `checkpoints`)
//! - `RATE_LIMIT_POST` / `RATE_LIMIT_REPLY` / `RATE_LIMIT_VOTE` /
//!   `RATE_LIMIT_ANON` -- per-action limits handed to the external
//!   limiter (parsed, not enforced here)

use agora_types::EMBEDDING_DIMENSION;

use crate::error::StartupError;

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Discourse engine base URL.
    pub discourse_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Shared secret guarding `/internal/*`.
    pub internal_secret: String,
    /// HS256 secret for session tokens.
    pub jwt_secret: String,
    /// Expected identity-token audience.
    pub jwt_audience: String,
    /// JWKS endpoint for identity-token verification.
    pub jwks_url: String,
    /// Allowlisted service account emails.
    pub service_allowlist: Vec<String>,
    /// Session token lifetime in seconds.
    pub session_ttl_secs: u64,
    /// Threshold after which processing runs count as stuck.
    pub staleness_threshold_secs: u64,
    /// Cron expression for the karma batch.
    pub karma_schedule: String,
    /// Directory for pipeline checkpoint blobs.
    pub checkpoint_dir: String,
    /// Per-action rate limits, handed to the external limiter.
    pub rate_limits: RateLimits,
}

/// Per-action rate limits (requests per minute).
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    /// Post creations.
    pub post: u32,
    /// Reply creations.
    pub reply: u32,
    /// Vote casts.
    pub vote: u32,
    /// Anonymous reads.
    pub anonymous: u32,
}

impl ServerSettings {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Config`] for a missing `DATABASE_URL` or
    /// `JWT_SECRET`, a malformed numeric variable, or an embedding
    /// dimension that does not match the schema.
    pub fn from_env() -> Result<Self, StartupError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let embedding_dimension: usize = optional_parsed(
            "EMBEDDING_DIMENSION",
            EMBEDDING_DIMENSION,
        )?;
        if embedding_dimension != EMBEDDING_DIMENSION {
            return Err(StartupError::Config(format!(
                "EMBEDDING_DIMENSION {embedding_dimension} does not match the schema \
                 dimension {EMBEDDING_DIMENSION}"
            )));
        }

        Ok(Self {
            database_url,
            discourse_url: optional("DISCOURSE_ENGINE_URL", "http://localhost:9000"),
            host: optional("HOST", "0.0.0.0"),
            port: optional_parsed("PORT", 8080_u16)?,
            internal_secret: optional("INTERNAL_SECRET", ""),
            jwt_secret,
            jwt_audience: optional("JWT_AUDIENCE", "agora"),
            jwks_url: optional(
                "SERVICE_JWKS_URL",
                "https://www.googleapis.com/oauth2/v3/certs",
            ),
            service_allowlist: optional("SERVICE_ALLOWLIST", "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            session_ttl_secs: optional_parsed("SESSION_TTL_SECS", 86_400_u64)?,
            staleness_threshold_secs: optional_parsed(
                "STALENESS_THRESHOLD_SECS",
                agora_analysis::DEFAULT_STALENESS_THRESHOLD_SECS,
            )?,
            karma_schedule: optional(
                "KARMA_BATCH_SCHEDULE",
                agora_analysis::DEFAULT_KARMA_SCHEDULE,
            ),
            checkpoint_dir: optional("CHECKPOINT_DIR", "checkpoints"),
            rate_limits: RateLimits {
                post: optional_parsed("RATE_LIMIT_POST", 10_u32)?,
                reply: optional_parsed("RATE_LIMIT_REPLY", 30_u32)?,
                vote: optional_parsed("RATE_LIMIT_VOTE", 60_u32)?,
                anonymous: optional_parsed("RATE_LIMIT_ANON", 120_u32)?,
            },
        })
    }
}

/// Read a required environment variable.
fn required(name: &str) -> Result<String, StartupError> {
    std::env::var(name)
        .map_err(|e| StartupError::Config(format!("missing required env var {name}: {e}")))
}

/// Read an optional environment variable with a default.
fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Read and parse an optional environment variable with a default.
fn optional_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, StartupError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| StartupError::Config(format!("invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
