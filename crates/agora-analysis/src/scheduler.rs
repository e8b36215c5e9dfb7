//! Cron-driven scheduler for the daily karma batch.

use std::str::FromStr;

use chrono::Utc;
use cron::Schedule;

use crate::error::AnalysisError;
use crate::karma::KarmaBatch;

/// Default schedule: every night at 03:00 UTC.
pub const DEFAULT_KARMA_SCHEDULE: &str = "0 0 3 * * *";

/// Wraps a [`cron::Schedule`] and fires the karma batch at each tick.
pub struct KarmaScheduler {
    schedule: Schedule,
}

impl KarmaScheduler {
    /// Parse a cron expression (seconds granularity, UTC).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] on a malformed expression.
    pub fn new(expression: &str) -> Result<Self, AnalysisError> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            AnalysisError::Config(format!("bad karma schedule {expression:?}: {e}"))
        })?;
        Ok(Self { schedule })
    }

    /// Sleep until each upcoming fire time and run the batch. Errors are
    /// logged, never fatal.
    pub async fn run_loop(self, batch: KarmaBatch) {
        tracing::info!("Karma scheduler started");
        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                tracing::warn!("Karma schedule has no upcoming fire times, stopping");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tracing::debug!(fire_at = %next, "Karma batch sleeping");
            tokio::time::sleep(wait).await;

            match batch.run().await {
                Ok(summary) => {
                    tracing::info!(users = summary.users_updated, "Karma batch ran");
                }
                Err(e) => tracing::warn!(error = %e, "Karma batch failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_parses() {
        assert!(KarmaScheduler::new(DEFAULT_KARMA_SCHEDULE).is_ok());
    }

    #[test]
    fn bad_schedule_is_a_config_error() {
        let result = KarmaScheduler::new("not a cron line");
        assert!(matches!(result, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn schedule_yields_future_fire_times() {
        let scheduler = KarmaScheduler::new("0 0 3 * * *");
        let Ok(scheduler) = scheduler else {
            return;
        };
        let next = scheduler.schedule.upcoming(Utc).next();
        assert!(next.is_some_and(|t| t > Utc::now()));
    }
}
