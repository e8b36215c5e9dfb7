//! V4 gamification persistence: the escrow lifecycle on bridge schemes,
//! evidence ranking, equivocation detection, and karma scalars.
//!
//! The "one active escrow per unordered component pair" rule is the
//! partial unique index on `scheme_nodes`; conflicting activations are
//! silently dropped rather than surfaced.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use agora_types::UserId;

use crate::error::DbError;

/// An active escrow due for resolution or expiry, with the parties.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EscrowParties {
    /// The escrowed scheme.
    pub scheme_id: Uuid,
    /// Bounty held in escrow.
    pub pending_bounty: Decimal,
    /// Author of the content the scheme was extracted from.
    pub content_author: Option<String>,
    /// Author of the accepted answer, when one exists.
    pub answer_author: Option<String>,
}

/// Per-user 24 h graph deltas feeding the karma yields.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KarmaDelta {
    /// The credited user.
    pub author_id: String,
    /// New ROOT I-nodes on the user's content.
    pub root_nodes: i64,
    /// New SUPPORT premises on the user's content.
    pub support_nodes: i64,
    /// New ATTACK premises on the user's content.
    pub attack_nodes: i64,
}

/// A node newly defeated by the evidence-rank pass.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DefeatedNode {
    /// The defeated I-node.
    pub id: Uuid,
    /// Kind of its source content.
    pub source_type: String,
    /// Identifier of its source content.
    pub source_id: Uuid,
}

/// A downstream party to notify about an upstream defeat.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DownstreamParty {
    /// The defeated upstream node.
    pub defeated_node_id: Uuid,
    /// The dependent conclusion node.
    pub conclusion_node_id: Uuid,
    /// Author of the dependent content.
    pub author_id: Option<String>,
}

/// Operations backing the V4 gamification engine.
pub struct GamificationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> GamificationStore<'a> {
    /// Create a gamification store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Activate an escrow on a bridge scheme.
    ///
    /// Returns `false` when the partial unique index rejects the write
    /// (another active escrow already covers the component pair); the
    /// conflict is deliberately silent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] for any other failure.
    pub async fn activate_escrow(
        &self,
        scheme_id: Uuid,
        component_a: Uuid,
        component_b: Uuid,
        bounty: Decimal,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE scheme_nodes
              SET is_bridge = TRUE,
                  escrow_status = 'active',
                  component_a_id = $2,
                  component_b_id = $3,
                  pending_bounty = $4,
                  escrow_expires_at = $5
              WHERE id = $1 AND escrow_status = 'none'",
        )
        .bind(scheme_id)
        .bind(component_a)
        .bind(component_b)
        .bind(bounty)
        .bind(expires_at)
        .execute(self.pool)
        .await
        .map_err(DbError::from);

        match result {
            Ok(r) => Ok(r.rows_affected() > 0),
            Err(e) if e.is_unique_violation() => {
                tracing::debug!(%scheme_id, "Dropped conflicting bridge activation");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Active escrows whose expiry has elapsed, with their parties.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn expired_escrows(&self) -> Result<Vec<EscrowParties>, DbError> {
        let rows = sqlx::query_as::<_, EscrowParties>(
            r"SELECT s.id AS scheme_id,
                     s.pending_bounty,
                     COALESCE(p.author_id, rp.author_id) AS content_author,
                     NULL::VARCHAR AS answer_author
              FROM scheme_nodes s
              JOIN analysis_runs r ON r.id = s.run_id
              LEFT JOIN posts p ON r.source_type = 'post' AND p.id = r.source_id
              LEFT JOIN replies rp ON r.source_type = 'reply' AND rp.id = r.source_id
              WHERE s.escrow_status = 'active'
                AND s.escrow_expires_at IS NOT NULL
                AND s.escrow_expires_at < now()",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Active, unexpired escrows whose scheme carries an accepted answer:
    /// a resolved Socratic question, or an accepted enthymeme that was
    /// backfilled into the thread.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn resolvable_escrows(&self) -> Result<Vec<EscrowParties>, DbError> {
        let rows = sqlx::query_as::<_, EscrowParties>(
            r"SELECT DISTINCT ON (s.id)
                     s.id AS scheme_id,
                     s.pending_bounty,
                     COALESCE(p.author_id, rp.author_id) AS content_author,
                     COALESCE(qr.author_id, er.author_id) AS answer_author
              FROM scheme_nodes s
              JOIN analysis_runs r ON r.id = s.run_id
              LEFT JOIN posts p ON r.source_type = 'post' AND p.id = r.source_id
              LEFT JOIN replies rp ON r.source_type = 'reply' AND rp.id = r.source_id
              LEFT JOIN socratic_questions q
                   ON q.scheme_id = s.id AND q.resolution_reply_id IS NOT NULL
              LEFT JOIN replies qr ON qr.id = q.resolution_reply_id
              LEFT JOIN enthymemes e
                   ON e.scheme_id = s.id AND e.status = 'accepted'
              LEFT JOIN replies er ON er.id = e.reconstructed_reply_id
              WHERE s.escrow_status = 'active'
                AND (s.escrow_expires_at IS NULL OR s.escrow_expires_at >= now())
                AND COALESCE(qr.author_id, er.author_id) IS NOT NULL
              ORDER BY s.id, qr.created_at NULLS LAST",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Transition an active escrow to a terminal state
    /// (paid / stolen / languished).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the escrow is no longer active.
    pub async fn settle_escrow(&self, scheme_id: Uuid, outcome: &str) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE scheme_nodes SET escrow_status = $1
              WHERE id = $2 AND escrow_status = 'active'",
        )
        .bind(outcome)
        .bind(scheme_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("active escrow on {scheme_id}")));
        }
        Ok(())
    }

    /// Insert equivocation flags for one run: any term appearing on both
    /// the premise and conclusion side of a scheme under two different
    /// concepts. Idempotent by the (scheme, term) unique constraint.
    ///
    /// Returns the number of new flags.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn detect_equivocations(&self, run_id: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query(
            r"INSERT INTO equivocation_flags
                  (scheme_id, term, premise_concept_id, conclusion_concept_id)
              SELECT DISTINCT prem.scheme_id, pc.term, pc.concept_id, cc.concept_id
              FROM argument_edges prem
              JOIN scheme_nodes s ON s.id = prem.scheme_id
              JOIN argument_edges conc
                   ON conc.scheme_id = prem.scheme_id AND conc.role = 'conclusion'
              JOIN inode_concepts pc ON pc.node_id = prem.node_id
              JOIN inode_concepts cc
                   ON cc.node_id = conc.node_id AND cc.term = pc.term
              WHERE s.run_id = $1
                AND prem.role = 'premise'
                AND prem.node_id IS NOT NULL
                AND pc.concept_id <> cc.concept_id
              ON CONFLICT (scheme_id, term) DO NOTHING",
        )
        .bind(run_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Recompute evidence ranks for every I-node:
    /// `base_weight + ln(1 + max(content score, 0)) - 0.5 * live attackers`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn refresh_evidence_ranks(&self) -> Result<(), DbError> {
        sqlx::query(
            r"WITH content_scores AS (
                  SELECT n.id AS node_id,
                         GREATEST(COALESCE(p.score, rp.score, 0), 0) AS pos_score
                  FROM information_nodes n
                  LEFT JOIN posts p
                       ON n.source_type = 'post' AND p.id = n.source_id
                  LEFT JOIN replies rp
                       ON n.source_type = 'reply' AND rp.id = n.source_id
              ),
              attackers AS (
                  SELECT conc.node_id AS node_id,
                         COUNT(DISTINCT prem.node_id) AS cnt
                  FROM argument_edges conc
                  JOIN scheme_nodes s
                       ON s.id = conc.scheme_id AND s.direction = 'ATTACK'
                  JOIN argument_edges prem
                       ON prem.scheme_id = s.id AND prem.role = 'premise'
                  LEFT JOIN information_nodes pn ON pn.id = prem.node_id
                  WHERE conc.role = 'conclusion'
                    AND (pn.id IS NULL OR pn.is_defeated = FALSE)
                  GROUP BY conc.node_id
              )
              UPDATE information_nodes n
              SET evidence_rank = n.base_weight
                  + ln(1 + cs.pos_score)
                  - 0.5 * COALESCE(a.cnt, 0)
              FROM content_scores cs
              LEFT JOIN attackers a ON a.node_id = cs.node_id
              WHERE cs.node_id = n.id",
        )
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Flip nodes whose evidence rank dropped below zero to defeated and
    /// return them; nodes that recovered are revived silently.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the updates fail.
    pub async fn apply_defeats(&self) -> Result<Vec<DefeatedNode>, DbError> {
        sqlx::query(
            r"UPDATE information_nodes SET is_defeated = FALSE
              WHERE is_defeated = TRUE AND evidence_rank >= 0",
        )
        .execute(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, DefeatedNode>(
            r"UPDATE information_nodes SET is_defeated = TRUE
              WHERE is_defeated = FALSE AND evidence_rank < 0
              RETURNING id, source_type, source_id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// For a set of newly defeated nodes, the downstream conclusions that
    /// depend on them and the authors to notify.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn downstream_parties(
        &self,
        defeated: &[Uuid],
    ) -> Result<Vec<DownstreamParty>, DbError> {
        let rows = sqlx::query_as::<_, DownstreamParty>(
            r"SELECT DISTINCT d.id AS defeated_node_id,
                     cn.id AS conclusion_node_id,
                     COALESCE(p.author_id, rp.author_id) AS author_id
              FROM information_nodes d
              JOIN argument_edges prem
                   ON prem.node_id = d.id AND prem.role = 'premise'
              JOIN argument_edges conc
                   ON conc.scheme_id = prem.scheme_id AND conc.role = 'conclusion'
              JOIN information_nodes cn ON cn.id = conc.node_id
              LEFT JOIN posts p ON cn.source_type = 'post' AND p.id = cn.source_id
              LEFT JOIN replies rp ON cn.source_type = 'reply' AND rp.id = cn.source_id
              WHERE d.id = ANY($1)",
        )
        .bind(defeated)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Per-author counts of new I-nodes by role since `since`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn karma_deltas_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<KarmaDelta>, DbError> {
        let rows = sqlx::query_as::<_, KarmaDelta>(
            r"SELECT COALESCE(p.author_id, rp.author_id) AS author_id,
                     COUNT(*) FILTER (WHERE n.node_role = 'ROOT') AS root_nodes,
                     COUNT(*) FILTER (WHERE n.node_role = 'SUPPORT') AS support_nodes,
                     COUNT(*) FILTER (WHERE n.node_role = 'ATTACK') AS attack_nodes
              FROM information_nodes n
              LEFT JOIN posts p ON n.source_type = 'post' AND p.id = n.source_id
              LEFT JOIN replies rp ON n.source_type = 'reply' AND rp.id = n.source_id
              WHERE n.created_at >= $1
                AND COALESCE(p.author_id, rp.author_id) IS NOT NULL
              GROUP BY COALESCE(p.author_id, rp.author_id)",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Apply one user's daily yields and refresh the aggregate score, in
    /// one statement (one transaction per user).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn apply_karma(
        &self,
        user: &UserId,
        pioneer: Decimal,
        builder: Decimal,
        critic: Decimal,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE users
              SET pioneer_karma = pioneer_karma + $2,
                  builder_karma = builder_karma + $3,
                  critic_karma = critic_karma + $4,
                  epistemic_score = (pioneer_karma + $2)
                      + (builder_karma + $3)
                      + (critic_karma + $4)
              WHERE id = $1",
        )
        .bind(user.as_str())
        .bind(pioneer)
        .bind(builder)
        .bind(critic)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
