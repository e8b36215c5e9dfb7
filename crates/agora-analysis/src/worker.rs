//! The analysis worker: drains pending runs through the discourse engine
//! and into the hypergraph.
//!
//! Pipeline per run:
//!
//! 1. Claim the oldest pending run (`FOR UPDATE SKIP LOCKED`).
//! 2. Load the source content; a deleted source fails the run.
//! 3. Ask the discourse engine for the argument graph; an empty graph
//!    fails the run ("discourse engine returned no analysis").
//! 4. Commit the graph transactionally.
//! 5. Post-process: node roles, component partition, bridge escrows,
//!    equivocation flags, content embedding, enthymeme backfill.
//! 6. Mark the run completed.
//!
//! Engine failures halt the stream for that content: the run fails and
//! the author receives a STREAM_HALTED notification. The worker itself
//! keeps running.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use agora_db::{
    ContentStore, DbError, EmbeddingStore, GamificationStore, GraphStore, NotificationStore,
    PostgresPool, RunRow, RunStore, UserStore,
};
use agora_db::run_store::EMPTY_ANALYSIS_MESSAGE;
use agora_discourse::DiscourseClient;
use agora_types::{EpistemicNotificationType, TargetKind, UserId};

use crate::backfill;
use crate::components::{self, SchemeNodes};
use crate::error::AnalysisError;

/// Default idle delay between queue polls.
const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(5);

/// Default bounty posted on a new bridge escrow.
const DEFAULT_BRIDGE_BOUNTY: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Default escrow lifetime in days.
const DEFAULT_ESCROW_TTL_DAYS: i64 = 7;

/// The analysis worker.
pub struct AnalysisWorker {
    pool: PostgresPool,
    discourse: DiscourseClient,
    idle_delay: Duration,
    bridge_bounty: Decimal,
    escrow_ttl_days: i64,
}

impl AnalysisWorker {
    /// Create a worker bound to the shared pool and engine client.
    pub const fn new(pool: PostgresPool, discourse: DiscourseClient) -> Self {
        Self {
            pool,
            discourse,
            idle_delay: DEFAULT_IDLE_DELAY,
            bridge_bounty: DEFAULT_BRIDGE_BOUNTY,
            escrow_ttl_days: DEFAULT_ESCROW_TTL_DAYS,
        }
    }

    /// Override the idle delay between queue polls.
    #[must_use]
    pub const fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Drain the queue forever. Errors are logged, never fatal.
    pub async fn run_loop(self) {
        tracing::info!("Analysis worker started");
        loop {
            match self.process_next().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.idle_delay).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Analysis worker iteration failed");
                    tokio::time::sleep(self.idle_delay).await;
                }
            }
        }
    }

    /// Claim and process one pending run. Returns `false` when the queue
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] only for infrastructure failures; a
    /// failed analysis marks its own run failed and returns `Ok(true)`.
    pub async fn process_next(&self) -> Result<bool, AnalysisError> {
        let runs = RunStore::new(self.pool.pool());
        let Some(run) = runs.claim_next_pending().await? else {
            return Ok(false);
        };
        tracing::info!(run_id = %run.id, source = %run.source_id, "Processing analysis run");

        if let Err(e) = self.process_run(&run).await {
            let message = e.to_string();
            tracing::warn!(run_id = %run.id, error = %message, "Analysis run failed");
            if let Err(mark_err) = runs.mark_failed(run.id, &message).await {
                tracing::error!(run_id = %run.id, error = %mark_err, "Could not fail run");
            }
            self.notify_stream_halted(&run, &message).await;
        }
        Ok(true)
    }

    async fn process_run(&self, run: &RunRow) -> Result<(), AnalysisError> {
        let runs = RunStore::new(self.pool.pool());
        let source_type = TargetKind::parse(&run.source_type)
            .ok_or_else(|| DbError::Decode(format!("bad source type {}", run.source_type)))?;

        let text = self.load_source_text(source_type, run.source_id).await?;

        let graph = self
            .discourse
            .analyze(&text, source_type, run.source_id)
            .await?;
        if graph.is_empty() {
            runs.mark_failed(run.id, EMPTY_ANALYSIS_MESSAGE).await?;
            self.notify_stream_halted(run, EMPTY_ANALYSIS_MESSAGE).await;
            return Ok(());
        }

        let graphs = GraphStore::new(self.pool.pool());
        graphs
            .write_analysis(run.id, source_type, run.source_id, &graph)
            .await?;

        self.post_process(run).await?;

        // Embedding failures degrade search, not the run.
        if let Err(e) = self.embed_content(source_type, run.source_id, &text).await {
            tracing::warn!(run_id = %run.id, error = %e, "Content embedding failed");
        }

        runs.mark_completed(run.id).await?;
        tracing::info!(run_id = %run.id, "Analysis run completed");
        Ok(())
    }

    /// Node roles, component partition, bridge escrows, equivocation
    /// flags, and the enthymeme backfill, in that order.
    async fn post_process(&self, run: &RunRow) -> Result<(), AnalysisError> {
        let graphs = GraphStore::new(self.pool.pool());
        let gamification = GamificationStore::new(self.pool.pool());

        graphs.refresh_node_roles(run.id).await?;

        let inodes = graphs.inodes_for_run(run.id).await?;
        let node_ids: Vec<Uuid> = inodes.iter().map(|n| n.id).collect();
        let schemes = self.scheme_footprints(run.id).await?;
        let result = components::partition(&node_ids, &schemes);

        // Group nodes by component and cache the assignment.
        let mut groups: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (node, component) in &result.assignments {
            groups.entry(*component).or_default().push(*node);
        }
        for (component, members) in &groups {
            graphs.set_component(*component, members).await?;
        }

        let expires_at = Utc::now() + chrono::Duration::days(self.escrow_ttl_days);
        for bridge in &result.bridges {
            let activated = gamification
                .activate_escrow(
                    bridge.scheme_id,
                    bridge.component_a,
                    bridge.component_b,
                    self.bridge_bounty,
                    expires_at,
                )
                .await?;
            if activated {
                tracing::debug!(scheme = %bridge.scheme_id, "Activated bridge escrow");
            }
        }

        let flags = gamification.detect_equivocations(run.id).await?;
        if flags > 0 {
            tracing::info!(run_id = %run.id, flags, "Flagged equivocations");
        }

        let users = UserStore::new(self.pool.pool());
        if let Some(system) = users.system_user().await? {
            if let Some(system_id) = UserId::new(&system.id) {
                let inserted =
                    backfill::backfill_enthymemes(&self.pool, &system_id, run).await?;
                if inserted > 0 {
                    tracing::info!(run_id = %run.id, inserted, "Backfilled enthymeme replies");
                }
            }
        } else {
            tracing::debug!("No system user; skipping enthymeme backfill");
        }

        Ok(())
    }

    /// A run's schemes with their premise/conclusion I-node footprints,
    /// in creation order.
    async fn scheme_footprints(&self, run_id: Uuid) -> Result<Vec<SchemeNodes>, AnalysisError> {
        let graphs = GraphStore::new(self.pool.pool());
        let schemes = graphs.schemes_for_run(run_id).await?;
        let edges = graphs.edges_for_run(run_id).await?;

        let mut footprints: Vec<SchemeNodes> = schemes
            .iter()
            .map(|s| SchemeNodes {
                scheme_id: s.id,
                premises: Vec::new(),
                conclusions: Vec::new(),
            })
            .collect();
        let index: HashMap<Uuid, usize> = schemes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();

        for edge in edges {
            let Some(node_id) = edge.node_id else { continue };
            let Some(&i) = index.get(&edge.scheme_id) else {
                continue;
            };
            if let Some(footprint) = footprints.get_mut(i) {
                match edge.role.as_str() {
                    "premise" => footprint.premises.push(node_id),
                    "conclusion" => footprint.conclusions.push(node_id),
                    _ => {}
                }
            }
        }
        Ok(footprints)
    }

    async fn load_source_text(
        &self,
        source_type: TargetKind,
        source_id: Uuid,
    ) -> Result<String, AnalysisError> {
        let content = ContentStore::new(self.pool.pool());
        let text = match source_type {
            TargetKind::Post => {
                let post = content.get_post(source_id).await?;
                format!("{}\n{}", post.title, post.content)
            }
            TargetKind::Reply => content.get_reply(source_id).await?.content,
        };
        Ok(text)
    }

    async fn embed_content(
        &self,
        source_type: TargetKind,
        source_id: Uuid,
        text: &str,
    ) -> Result<(), AnalysisError> {
        let embedding = self.discourse.embed_one(text).await?;
        EmbeddingStore::new(self.pool.pool())
            .upsert_content(source_type, source_id, &embedding)
            .await?;
        Ok(())
    }

    async fn notify_stream_halted(&self, run: &RunRow, message: &str) {
        let author = match self.source_author(run).await {
            Ok(Some(author)) => author,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(run_id = %run.id, error = %e, "No author for halt notice");
                return;
            }
        };
        let payload = serde_json::json!({
            "source_type": run.source_type,
            "source_id": run.source_id,
            "error": message,
        });
        // Targets the run, not the content: the content's (user, target)
        // slot belongs to the SOCIAL reply-coalescing row.
        let notifications = NotificationStore::new(self.pool.pool());
        if let Err(e) = notifications
            .record_epistemic(
                &author,
                "analysis_run",
                run.id,
                EpistemicNotificationType::StreamHalted,
                &payload,
            )
            .await
        {
            tracing::warn!(run_id = %run.id, error = %e, "Could not record halt notice");
        }
    }

    async fn source_author(&self, run: &RunRow) -> Result<Option<UserId>, AnalysisError> {
        let content = ContentStore::new(self.pool.pool());
        let author_id = match TargetKind::parse(&run.source_type) {
            Some(TargetKind::Post) => content.get_post(run.source_id).await?.author_id,
            Some(TargetKind::Reply) => content.get_reply(run.source_id).await?.author_id,
            None => return Ok(None),
        };
        Ok(UserId::new(&author_id))
    }
}
