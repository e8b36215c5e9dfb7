//! The nightly karma batch.
//!
//! One pass, in order:
//!
//! 1. Recompute evidence ranks for every I-node (votes reach the graph
//!    only through this step under V4).
//! 2. Apply defeats and fan out UPSTREAM_DEFEATED notifications to the
//!    authors of dependent conclusions.
//! 3. Settle resolvable escrows: accepted answer by the content author
//!    pays the bounty, by anyone else steals it.
//! 4. Languish expired escrows.
//! 5. Compute per-user daily yields from the trailing 24 h of graph
//!    deltas and bounty settlements, and apply them one user at a time
//!    (one transaction per user).

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use agora_db::{GamificationStore, NotificationStore, PostgresPool};
use agora_types::{EpistemicNotificationType, UserId};

use crate::error::AnalysisError;

/// Pioneer karma per new ROOT node.
const PIONEER_PER_ROOT: Decimal = Decimal::from_parts(1, 0, 0, false, 0);

/// Builder karma per new SUPPORT premise.
const BUILDER_PER_SUPPORT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Builder karma per bounty paid out.
const BUILDER_PER_BOUNTY_PAID: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Critic karma per new ATTACK premise.
const CRITIC_PER_ATTACK: Decimal = Decimal::from_parts(75, 0, 0, false, 2);

/// Critic karma per bounty stolen.
const CRITIC_PER_BOUNTY_STOLEN: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Window of graph deltas feeding the daily yields.
const YIELD_WINDOW_HOURS: i64 = 24;

/// Outcome counters of one batch pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct KarmaBatchSummary {
    /// Users whose karma changed.
    pub users_updated: usize,
    /// Nodes newly defeated.
    pub nodes_defeated: usize,
    /// Escrows paid to the original author.
    pub escrows_paid: usize,
    /// Escrows stolen by another user.
    pub escrows_stolen: usize,
    /// Escrows expired unresolved.
    pub escrows_languished: usize,
}

/// The daily karma batch job.
pub struct KarmaBatch {
    pool: PostgresPool,
}

impl KarmaBatch {
    /// Create a batch job bound to the shared pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// Run one full pass.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if any step's SQL fails; settled escrows
    /// and applied yields up to that point remain committed.
    pub async fn run(&self) -> Result<KarmaBatchSummary, AnalysisError> {
        let gamification = GamificationStore::new(self.pool.pool());
        let notifications = NotificationStore::new(self.pool.pool());
        let mut summary = KarmaBatchSummary::default();

        // 1 + 2: evidence ranks, defeats, upstream fan-out.
        gamification.refresh_evidence_ranks().await?;
        let defeated = gamification.apply_defeats().await?;
        summary.nodes_defeated = defeated.len();
        if !defeated.is_empty() {
            let ids: Vec<_> = defeated.iter().map(|d| d.id).collect();
            for party in gamification.downstream_parties(&ids).await? {
                let Some(author) = party.author_id.as_deref().and_then(UserId::new) else {
                    continue;
                };
                let payload = serde_json::json!({
                    "defeated_node_id": party.defeated_node_id,
                });
                notifications
                    .record_epistemic(
                        &author,
                        "inode",
                        party.conclusion_node_id,
                        EpistemicNotificationType::UpstreamDefeated,
                        &payload,
                    )
                    .await?;
            }
        }

        // 3: settle resolvable escrows. Bounty settlements feed the
        // yield computation below.
        let mut paid_bonus: HashMap<String, u32> = HashMap::new();
        let mut stolen_bonus: HashMap<String, u32> = HashMap::new();
        for escrow in gamification.resolvable_escrows().await? {
            let (Some(content_author), Some(answer_author)) =
                (escrow.content_author.clone(), escrow.answer_author.clone())
            else {
                continue;
            };

            let paid = answer_author == content_author;
            let (outcome, kind) = if paid {
                ("paid", EpistemicNotificationType::BountyPaid)
            } else {
                ("stolen", EpistemicNotificationType::BountyStolen)
            };
            gamification.settle_escrow(escrow.scheme_id, outcome).await?;

            let payload = serde_json::json!({
                "scheme_id": escrow.scheme_id,
                "bounty": escrow.pending_bounty,
                "answer_author": &answer_author,
            });
            if let Some(recipient) = UserId::new(&content_author) {
                notifications
                    .record_epistemic(&recipient, "scheme", escrow.scheme_id, kind, &payload)
                    .await?;
            }

            if paid {
                summary.escrows_paid = summary.escrows_paid.saturating_add(1);
                *paid_bonus.entry(content_author).or_default() += 1;
            } else {
                summary.escrows_stolen = summary.escrows_stolen.saturating_add(1);
                *stolen_bonus.entry(answer_author).or_default() += 1;
            }
        }

        // 4: languish expired escrows.
        for escrow in gamification.expired_escrows().await? {
            gamification
                .settle_escrow(escrow.scheme_id, "languished")
                .await?;
            summary.escrows_languished = summary.escrows_languished.saturating_add(1);

            let Some(author) = escrow.content_author.as_deref().and_then(UserId::new) else {
                continue;
            };
            let payload = serde_json::json!({
                "scheme_id": escrow.scheme_id,
                "bounty": escrow.pending_bounty,
            });
            notifications
                .record_epistemic(
                    &author,
                    "scheme",
                    escrow.scheme_id,
                    EpistemicNotificationType::BountyLanguished,
                    &payload,
                )
                .await?;
        }

        // 5: daily yields.
        let since = Utc::now() - Duration::hours(YIELD_WINDOW_HOURS);
        let mut yields: HashMap<String, (Decimal, Decimal, Decimal)> = HashMap::new();
        for delta in gamification.karma_deltas_since(since).await? {
            let entry = yields.entry(delta.author_id.clone()).or_default();
            entry.0 += PIONEER_PER_ROOT * Decimal::from(delta.root_nodes);
            entry.1 += BUILDER_PER_SUPPORT * Decimal::from(delta.support_nodes);
            entry.2 += CRITIC_PER_ATTACK * Decimal::from(delta.attack_nodes);
        }
        for (user, count) in paid_bonus {
            let entry = yields.entry(user).or_default();
            entry.1 += BUILDER_PER_BOUNTY_PAID * Decimal::from(count);
        }
        for (user, count) in stolen_bonus {
            let entry = yields.entry(user).or_default();
            entry.2 += CRITIC_PER_BOUNTY_STOLEN * Decimal::from(count);
        }

        for (user, (pioneer, builder, critic)) in &yields {
            let Some(user_id) = UserId::new(user) else {
                continue;
            };
            gamification
                .apply_karma(&user_id, *pioneer, *builder, *critic)
                .await?;
            summary.users_updated = summary.users_updated.saturating_add(1);
        }

        tracing::info!(
            users = summary.users_updated,
            defeated = summary.nodes_defeated,
            paid = summary.escrows_paid,
            stolen = summary.escrows_stolen,
            languished = summary.escrows_languished,
            "Karma batch completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_constants_have_expected_values() {
        assert_eq!(PIONEER_PER_ROOT.to_string(), "1");
        assert_eq!(BUILDER_PER_SUPPORT.to_string(), "0.5");
        assert_eq!(BUILDER_PER_BOUNTY_PAID.to_string(), "2");
        assert_eq!(CRITIC_PER_ATTACK.to_string(), "0.75");
        assert_eq!(CRITIC_PER_BOUNTY_STOLEN.to_string(), "1.5");
    }

    #[test]
    fn yields_accumulate_per_user() {
        let mut yields: HashMap<String, (Decimal, Decimal, Decimal)> = HashMap::new();
        let entry = yields.entry("alice".to_owned()).or_default();
        entry.0 += PIONEER_PER_ROOT * Decimal::from(3_i64);
        entry.1 += BUILDER_PER_SUPPORT * Decimal::from(4_i64);
        let entry = yields.entry("alice".to_owned()).or_default();
        entry.2 += CRITIC_PER_ATTACK * Decimal::from(4_i64);

        let (p, b, c) = yields.get("alice").copied().unwrap_or_default();
        assert_eq!(p.to_string(), "3");
        assert_eq!(b.to_string(), "2.0");
        assert_eq!(c.to_string(), "3.00");
    }
}
