//! Agora server binary.
//!
//! Wires together the data layer, the discourse engine client, the
//! background analysis machinery, and the public API. All background
//! tasks share one `PostgreSQL` pool whose lifetime is the process.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from the environment
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Build the discourse engine client and warm the caches
//! 5. Resume any interrupted batch pipeline runs
//! 6. Spawn the analysis worker and staleness sweeper
//! 7. Spawn the karma batch scheduler
//! 8. Serve the API until the process terminates

mod config;
mod error;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use agora_analysis::{
    AnalysisWorker, CheckpointStorage, KarmaBatch, KarmaScheduler, PipelineOrchestrator,
    StalenessSweeper,
};
use agora_api::{AllowlistCache, AppState, AuthSettings, ServerConfig};
use agora_db::PostgresPool;
use agora_discourse::DiscourseClient;

use crate::config::ServerSettings;
use crate::error::StartupError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails; background task
/// failures after startup are logged, not fatal.
#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("agora-server starting");

    // 2. Load configuration.
    let settings = ServerSettings::from_env()?;
    info!(
        discourse_url = settings.discourse_url,
        staleness_threshold_secs = settings.staleness_threshold_secs,
        karma_schedule = settings.karma_schedule,
        rate_limit_post = settings.rate_limits.post,
        rate_limit_reply = settings.rate_limits.reply,
        rate_limit_vote = settings.rate_limits.vote,
        rate_limit_anon = settings.rate_limits.anonymous,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL and run migrations.
    let pool = PostgresPool::connect_url(&settings.database_url).await?;
    pool.run_migrations().await?;

    // 4. Discourse engine client and caches.
    let discourse = DiscourseClient::new(&settings.discourse_url);
    match discourse.health().await {
        Ok(true) => info!("Discourse engine healthy"),
        Ok(false) => tracing::warn!("Discourse engine reports unhealthy"),
        Err(e) => tracing::warn!(error = %e, "Discourse engine unreachable at startup"),
    }
    let allowlist = AllowlistCache::new(&settings.service_allowlist);
    info!(
        allowlisted = settings.service_allowlist.len(),
        "Service allowlist loaded"
    );

    // 5. Resume interrupted batch pipeline runs.
    let storage = CheckpointStorage::filesystem(Path::new(&settings.checkpoint_dir));
    let orchestrator = PipelineOrchestrator::new(pool.clone(), discourse.clone(), storage);
    tokio::spawn(async move {
        if let Err(e) = orchestrator.resume().await {
            tracing::warn!(error = %e, "Pipeline resume encountered an error");
        }
    });

    // 6. Analysis worker and staleness sweeper.
    let worker = AnalysisWorker::new(pool.clone(), discourse.clone());
    tokio::spawn(worker.run_loop());
    let sweeper = StalenessSweeper::new(pool.clone(), settings.staleness_threshold_secs);
    tokio::spawn(sweeper.run_loop());

    // 7. Karma batch scheduler.
    let scheduler = KarmaScheduler::new(&settings.karma_schedule)?;
    let batch = KarmaBatch::new(pool.clone());
    tokio::spawn(scheduler.run_loop(batch));

    // 8. Serve the API.
    let auth = AuthSettings {
        jwt_secret: settings.jwt_secret.clone(),
        jwt_audience: settings.jwt_audience.clone(),
        jwks_url: settings.jwks_url.clone(),
        session_ttl_secs: settings.session_ttl_secs,
    };
    let state = AppState::shared(
        pool,
        discourse,
        allowlist,
        auth,
        settings.internal_secret.clone(),
    );
    let server_config = ServerConfig {
        host: settings.host.clone(),
        port: settings.port,
    };
    agora_api::start_server(&server_config, state).await?;

    Ok(())
}
