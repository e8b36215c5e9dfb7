//! Staleness sweeper for the analysis run tracker.
//!
//! A run stuck in `processing` past the configured threshold is failed
//! with a descriptive message; `completed` runs that produced no nodes
//! are demoted to `failed` as well. Both sweeps are idempotent.

use std::time::Duration;

use agora_db::{PostgresPool, RunStore};

use crate::error::AnalysisError;

/// Default threshold after which a `processing` run counts as stuck.
pub const DEFAULT_STALENESS_THRESHOLD_SECS: u64 = 3_600;

/// Periodic sweeper over the `analysis_runs` table.
pub struct StalenessSweeper {
    pool: PostgresPool,
    threshold_secs: u64,
    interval: Duration,
}

impl StalenessSweeper {
    /// Create a sweeper with the given staleness threshold.
    pub const fn new(pool: PostgresPool, threshold_secs: u64) -> Self {
        Self {
            pool,
            threshold_secs,
            interval: Duration::from_secs(300),
        }
    }

    /// Override the sweep interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep. Returns (stale runs failed, empty runs demoted).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if either update fails.
    pub async fn sweep_once(&self) -> Result<(u64, u64), AnalysisError> {
        let runs = RunStore::new(self.pool.pool());
        let stale = runs.sweep_stale(self.threshold_secs).await?;
        let empty = runs.fail_empty_completed().await?;
        Ok((stale, empty))
    }

    /// Sweep forever on the configured interval. Errors are logged,
    /// never fatal.
    pub async fn run_loop(self) {
        tracing::info!(
            threshold_secs = self.threshold_secs,
            "Staleness sweeper started"
        );
        loop {
            if let Err(e) = self.sweep_once().await {
                tracing::warn!(error = %e, "Staleness sweep failed");
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
