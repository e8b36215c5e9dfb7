//! V3 hypergraph store: information nodes, scheme nodes, edges, and the
//! satellite tables (enthymemes, Socratic questions, extracted values,
//! concepts, equivocation flags, sources).
//!
//! Writes are transactional per run: everything one analysis produced is
//! committed together, so no reader ever observes a half-written run.
//! Deleting a run cascades to all of it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use agora_types::{AnalysisGraph, EdgeRole, TargetKind};

use crate::error::DbError;
use crate::vector;

/// Counts of what one analysis write committed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphWriteSummary {
    /// Information nodes inserted.
    pub inodes: usize,
    /// Scheme nodes inserted.
    pub schemes: usize,
    /// Edges inserted.
    pub edges: usize,
    /// Enthymemes inserted.
    pub enthymemes: usize,
}

/// A row from the `information_nodes` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct InodeRow {
    /// Node identifier.
    pub id: Uuid,
    /// The run that produced this node.
    pub run_id: Uuid,
    /// Kind of the source content.
    pub source_type: String,
    /// Identifier of the source content.
    pub source_id: Uuid,
    /// Extracted text.
    pub content: String,
    /// Optional neutral rewrite.
    pub rewritten_content: Option<String>,
    /// FACT / VALUE / POLICY.
    pub epistemic_type: String,
    /// Span start (inclusive).
    pub span_start: i32,
    /// Span end (exclusive).
    pub span_end: i32,
    /// Classification confidence.
    pub fvp_confidence: Option<f32>,
    /// Extraction confidence.
    pub extraction_confidence: Option<f32>,
    /// Finer FACT classification (V4).
    pub fact_subtype: Option<String>,
    /// Evidence base weight (V4).
    pub base_weight: f32,
    /// Batch-computed evidence rank (V4).
    pub evidence_rank: f32,
    /// Whether the node is currently defeated (V4).
    pub is_defeated: bool,
    /// Connected-component cache (V4).
    pub component_id: Option<Uuid>,
    /// ROOT / SUPPORT / ATTACK (V4).
    pub node_role: String,
    /// Backing source, when the node cites one (V4).
    pub source_ref_id: Option<Uuid>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
}

/// Columns selected for every I-node read (embedding omitted).
const INODE_COLUMNS: &str = "id, run_id, source_type, source_id, content, rewritten_content, \
     epistemic_type, span_start, span_end, fvp_confidence, extraction_confidence, \
     fact_subtype, base_weight, evidence_rank, is_defeated, component_id, node_role, \
     source_ref_id, created_at, updated_at";

/// A row from the `scheme_nodes` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct SchemeRow {
    /// Scheme identifier.
    pub id: Uuid,
    /// The run that produced this scheme.
    pub run_id: Uuid,
    /// SUPPORT or ATTACK.
    pub direction: String,
    /// Named argumentation scheme, when recognized.
    pub logic_type: Option<String>,
    /// Scheme confidence.
    pub confidence: Option<f32>,
    /// Whether a logical gap was detected.
    pub gap_detected: bool,
    /// Detected fallacy kind.
    pub fallacy_type: Option<String>,
    /// Fallacy explanation.
    pub fallacy_explanation: Option<String>,
    /// Escrow state (V4).
    pub escrow_status: String,
    /// Escrow expiry (V4).
    pub escrow_expires_at: Option<DateTime<Utc>>,
    /// Bounty held in escrow (V4).
    pub pending_bounty: rust_decimal::Decimal,
    /// Whether this scheme bridges two components (V4).
    pub is_bridge: bool,
    /// First bridged component (V4).
    pub component_a_id: Option<Uuid>,
    /// Second bridged component (V4).
    pub component_b_id: Option<Uuid>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
}

/// A row from the `argument_edges` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct EdgeRow {
    /// Edge identifier.
    pub id: Uuid,
    /// The scheme this edge belongs to.
    pub scheme_id: Uuid,
    /// I-node origin, when set.
    pub node_id: Option<Uuid>,
    /// Source origin, when set (premise edges only).
    pub source_id: Option<Uuid>,
    /// premise / conclusion / motivation.
    pub role: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// A row from the `enthymemes` table.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct EnthymemeRow {
    /// Enthymeme identifier.
    pub id: Uuid,
    /// The scheme missing this premise.
    pub scheme_id: Uuid,
    /// Reconstructed premise text.
    pub content: String,
    /// FACT / VALUE / POLICY.
    pub epistemic_type: String,
    /// Probability the premise is genuinely assumed.
    pub probability: Option<f32>,
    /// pending / accepted / rejected.
    pub status: String,
    /// Reply inserted by the backfill, when done.
    pub reconstructed_reply_id: Option<Uuid>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub updated_at: DateTime<Utc>,
}

/// Operations on the hypergraph tables.
pub struct GraphStore<'a> {
    pool: &'a PgPool,
}

impl<'a> GraphStore<'a> {
    /// Create a graph store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Commit one run's full analysis graph in a single transaction.
    ///
    /// Payload-local indexes are resolved to fresh UUIDs here. Sources
    /// are deduplicated by URL, concepts by (term, definition);
    /// equivocation flags and concept mappings are idempotent by their
    /// unique constraints.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] for dangling local references or
    /// edges violating the origin rule, [`DbError::Postgres`] otherwise.
    pub async fn write_analysis(
        &self,
        run_id: Uuid,
        source_type: TargetKind,
        source_id: Uuid,
        graph: &AnalysisGraph,
    ) -> Result<GraphWriteSummary, DbError> {
        let mut tx = self.pool.begin().await?;

        let source_ids = insert_sources(&mut tx, graph).await?;
        let node_ids =
            insert_inodes(&mut tx, run_id, source_type, source_id, graph).await?;
        let scheme_ids = insert_schemes(&mut tx, run_id, graph).await?;
        insert_edges(&mut tx, graph, &node_ids, &scheme_ids, &source_ids).await?;
        insert_enthymemes(&mut tx, graph, &scheme_ids).await?;
        insert_questions(&mut tx, graph, &scheme_ids).await?;
        insert_extracted_values(&mut tx, run_id, graph, &node_ids).await?;
        let concept_ids = insert_concepts(&mut tx, graph, &node_ids).await?;
        insert_equivocations(&mut tx, graph, &scheme_ids, &concept_ids).await?;

        tx.commit().await?;

        let summary = GraphWriteSummary {
            inodes: graph.inodes.len(),
            schemes: graph.schemes.len(),
            edges: graph.edges.len(),
            enthymemes: graph.enthymemes.len(),
        };
        tracing::info!(
            %run_id,
            inodes = summary.inodes,
            schemes = summary.schemes,
            edges = summary.edges,
            "Committed analysis graph"
        );
        Ok(summary)
    }

    /// I-nodes of one run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn inodes_for_run(&self, run_id: Uuid) -> Result<Vec<InodeRow>, DbError> {
        let rows = sqlx::query_as::<_, InodeRow>(&format!(
            r"SELECT {INODE_COLUMNS} FROM information_nodes
              WHERE run_id = $1 ORDER BY span_start"
        ))
        .bind(run_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Scheme nodes of one run.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn schemes_for_run(&self, run_id: Uuid) -> Result<Vec<SchemeRow>, DbError> {
        let rows = sqlx::query_as::<_, SchemeRow>(
            r"SELECT * FROM scheme_nodes WHERE run_id = $1 ORDER BY created_at",
        )
        .bind(run_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Edges of one run (via their schemes).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn edges_for_run(&self, run_id: Uuid) -> Result<Vec<EdgeRow>, DbError> {
        let rows = sqlx::query_as::<_, EdgeRow>(
            r"SELECT e.* FROM argument_edges e
              JOIN scheme_nodes s ON s.id = e.scheme_id
              WHERE s.run_id = $1
              ORDER BY e.created_at",
        )
        .bind(run_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Enthymemes of one run that have not yet been backfilled into the
    /// thread as reconstructed replies.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn unbackfilled_enthymemes(
        &self,
        run_id: Uuid,
    ) -> Result<Vec<EnthymemeRow>, DbError> {
        let rows = sqlx::query_as::<_, EnthymemeRow>(
            r"SELECT e.* FROM enthymemes e
              JOIN scheme_nodes s ON s.id = e.scheme_id
              WHERE s.run_id = $1 AND e.reconstructed_reply_id IS NULL
              ORDER BY e.created_at",
        )
        .bind(run_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Link an enthymeme to the reply the backfill inserted for it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the enthymeme does not exist.
    pub async fn link_reconstructed_reply(
        &self,
        enthymeme_id: Uuid,
        reply_id: Uuid,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE enthymemes SET reconstructed_reply_id = $1 WHERE id = $2",
        )
        .bind(reply_id)
        .bind(enthymeme_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("enthymeme {enthymeme_id}")));
        }
        Ok(())
    }

    /// Recompute `node_role` for every I-node of a run from its outgoing
    /// premise edges: SUPPORT wins over ATTACK, ROOT when neither.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn refresh_node_roles(&self, run_id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE information_nodes n
              SET node_role = CASE
                  WHEN EXISTS (
                      SELECT 1 FROM argument_edges e
                      JOIN scheme_nodes s ON s.id = e.scheme_id
                      WHERE e.node_id = n.id AND e.role = 'premise'
                        AND s.direction = 'SUPPORT'
                  ) THEN 'SUPPORT'
                  WHEN EXISTS (
                      SELECT 1 FROM argument_edges e
                      JOIN scheme_nodes s ON s.id = e.scheme_id
                      WHERE e.node_id = n.id AND e.role = 'premise'
                        AND s.direction = 'ATTACK'
                  ) THEN 'ATTACK'
                  ELSE 'ROOT'
              END
              WHERE n.run_id = $1",
        )
        .bind(run_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Cache a component assignment on a set of I-nodes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn set_component(
        &self,
        component_id: Uuid,
        node_ids: &[Uuid],
    ) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE information_nodes SET component_id = $1 WHERE id = ANY($2)",
        )
        .bind(component_id)
        .bind(node_ids)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

async fn insert_sources(
    tx: &mut Transaction<'_, Postgres>,
    graph: &AnalysisGraph,
) -> Result<HashMap<u32, Uuid>, DbError> {
    let mut ids: HashMap<u32, Uuid> = HashMap::new();
    for source in &graph.sources {
        let parent_id = match source.parent {
            Some(p) => Some(*ids.get(&p).ok_or_else(|| {
                DbError::Validation(format!("source {} references unknown parent {p}", source.index))
            })?),
            None => None,
        };
        let embedding = None::<String>;
        // URL-bearing sources are global: reuse the existing row.
        let id: (Uuid,) = match &source.url {
            Some(url) => {
                sqlx::query_as(
                    r"INSERT INTO sources (level, parent_id, url, title, reputation, embedding)
                      VALUES ($1, $2, $3, $4, $5, $6::vector)
                      ON CONFLICT (url)
                      DO UPDATE SET reputation = EXCLUDED.reputation
                      RETURNING id",
                )
                .bind(source.level.as_str())
                .bind(parent_id)
                .bind(url)
                .bind(&source.title)
                .bind(source.reputation)
                .bind(&embedding)
                .fetch_one(&mut **tx)
                .await?
            }
            None => {
                sqlx::query_as(
                    r"INSERT INTO sources (level, parent_id, title, reputation, embedding)
                      VALUES ($1, $2, $3, $4, $5::vector)
                      RETURNING id",
                )
                .bind(source.level.as_str())
                .bind(parent_id)
                .bind(&source.title)
                .bind(source.reputation)
                .bind(&embedding)
                .fetch_one(&mut **tx)
                .await?
            }
        };
        ids.insert(source.index, id.0);
    }
    Ok(ids)
}

async fn insert_inodes(
    tx: &mut Transaction<'_, Postgres>,
    run_id: Uuid,
    source_type: TargetKind,
    source_id: Uuid,
    graph: &AnalysisGraph,
) -> Result<HashMap<u32, Uuid>, DbError> {
    let mut ids: HashMap<u32, Uuid> = HashMap::new();
    for node in &graph.inodes {
        if node.span_end <= node.span_start {
            return Err(DbError::Validation(format!(
                "inode {} has an empty span",
                node.index
            )));
        }
        let embedding = if node.embedding.is_empty() {
            None
        } else {
            Some(vector::encode(&node.embedding))
        };
        let id: (Uuid,) = sqlx::query_as(
            r"INSERT INTO information_nodes
                  (run_id, source_type, source_id, content, rewritten_content,
                   epistemic_type, fact_subtype, span_start, span_end,
                   fvp_confidence, extraction_confidence, embedding)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::vector)
              RETURNING id",
        )
        .bind(run_id)
        .bind(source_type.as_str())
        .bind(source_id)
        .bind(&node.content)
        .bind(&node.rewritten_content)
        .bind(node.epistemic_type.as_str())
        .bind(node.fact_subtype.map(|s| s.as_str()))
        .bind(i32::try_from(node.span_start).unwrap_or(i32::MAX))
        .bind(i32::try_from(node.span_end).unwrap_or(i32::MAX))
        .bind(node.fvp_confidence)
        .bind(node.extraction_confidence)
        .bind(&embedding)
        .fetch_one(&mut **tx)
        .await?;
        ids.insert(node.index, id.0);
    }
    Ok(ids)
}

async fn insert_schemes(
    tx: &mut Transaction<'_, Postgres>,
    run_id: Uuid,
    graph: &AnalysisGraph,
) -> Result<HashMap<u32, Uuid>, DbError> {
    let mut ids: HashMap<u32, Uuid> = HashMap::new();
    for scheme in &graph.schemes {
        let id: (Uuid,) = sqlx::query_as(
            r"INSERT INTO scheme_nodes
                  (run_id, direction, logic_type, confidence, gap_detected,
                   fallacy_type, fallacy_explanation)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              RETURNING id",
        )
        .bind(run_id)
        .bind(scheme.direction.as_str())
        .bind(&scheme.logic_type)
        .bind(scheme.confidence)
        .bind(scheme.gap_detected)
        .bind(&scheme.fallacy_type)
        .bind(&scheme.fallacy_explanation)
        .fetch_one(&mut **tx)
        .await?;
        ids.insert(scheme.index, id.0);
    }
    Ok(ids)
}

async fn insert_edges(
    tx: &mut Transaction<'_, Postgres>,
    graph: &AnalysisGraph,
    node_ids: &HashMap<u32, Uuid>,
    scheme_ids: &HashMap<u32, Uuid>,
    source_ids: &HashMap<u32, Uuid>,
) -> Result<(), DbError> {
    for edge in &graph.edges {
        let scheme_id = scheme_ids.get(&edge.scheme).ok_or_else(|| {
            DbError::Validation(format!("edge references unknown scheme {}", edge.scheme))
        })?;
        let node_id = match edge.node {
            Some(n) => Some(*node_ids.get(&n).ok_or_else(|| {
                DbError::Validation(format!("edge references unknown inode {n}"))
            })?),
            None => None,
        };
        let source_id = match edge.source {
            Some(s) => Some(*source_ids.get(&s).ok_or_else(|| {
                DbError::Validation(format!("edge references unknown source {s}"))
            })?),
            None => None,
        };

        // premise: exactly one origin; other roles: I-node only.
        let origin_ok = match edge.role {
            EdgeRole::Premise => node_id.is_some() != source_id.is_some(),
            EdgeRole::Conclusion | EdgeRole::Motivation => {
                node_id.is_some() && source_id.is_none()
            }
        };
        if !origin_ok {
            return Err(DbError::Validation(format!(
                "edge on scheme {} violates the origin rule for role {}",
                edge.scheme,
                edge.role.as_str()
            )));
        }

        sqlx::query(
            r"INSERT INTO argument_edges (scheme_id, node_id, source_id, role)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(scheme_id)
        .bind(node_id)
        .bind(source_id)
        .bind(edge.role.as_str())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_enthymemes(
    tx: &mut Transaction<'_, Postgres>,
    graph: &AnalysisGraph,
    scheme_ids: &HashMap<u32, Uuid>,
) -> Result<(), DbError> {
    for enthymeme in &graph.enthymemes {
        let scheme_id = scheme_ids.get(&enthymeme.scheme).ok_or_else(|| {
            DbError::Validation(format!(
                "enthymeme references unknown scheme {}",
                enthymeme.scheme
            ))
        })?;
        sqlx::query(
            r"INSERT INTO enthymemes (scheme_id, content, epistemic_type, probability)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(scheme_id)
        .bind(&enthymeme.content)
        .bind(enthymeme.epistemic_type.as_str())
        .bind(enthymeme.probability)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_questions(
    tx: &mut Transaction<'_, Postgres>,
    graph: &AnalysisGraph,
    scheme_ids: &HashMap<u32, Uuid>,
) -> Result<(), DbError> {
    for question in &graph.socratic_questions {
        let scheme_id = scheme_ids.get(&question.scheme).ok_or_else(|| {
            DbError::Validation(format!(
                "question references unknown scheme {}",
                question.scheme
            ))
        })?;
        sqlx::query(
            r"INSERT INTO socratic_questions (scheme_id, question, uncertainty)
              VALUES ($1, $2, $3)",
        )
        .bind(scheme_id)
        .bind(&question.question)
        .bind(question.uncertainty)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_extracted_values(
    tx: &mut Transaction<'_, Postgres>,
    run_id: Uuid,
    graph: &AnalysisGraph,
    node_ids: &HashMap<u32, Uuid>,
) -> Result<(), DbError> {
    for value in &graph.extracted_values {
        let node_id = node_ids.get(&value.node).ok_or_else(|| {
            DbError::Validation(format!("value references unknown inode {}", value.node))
        })?;
        sqlx::query(
            r"INSERT INTO extracted_values (run_id, node_id, value_name, confidence)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(run_id)
        .bind(node_id)
        .bind(&value.value)
        .bind(value.confidence)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_concepts(
    tx: &mut Transaction<'_, Postgres>,
    graph: &AnalysisGraph,
    node_ids: &HashMap<u32, Uuid>,
) -> Result<HashMap<u32, Uuid>, DbError> {
    let mut ids: HashMap<u32, Uuid> = HashMap::new();
    for concept in &graph.concepts {
        let embedding = if concept.embedding.is_empty() {
            None
        } else {
            Some(vector::encode(&concept.embedding))
        };
        // Global dedup by (term, definition); the no-op update lets
        // RETURNING yield the surviving row's id either way.
        let id: (Uuid,) = sqlx::query_as(
            r"INSERT INTO concept_nodes (term, definition, embedding)
              VALUES ($1, $2, $3::vector)
              ON CONFLICT (term, definition)
              DO UPDATE SET term = EXCLUDED.term
              RETURNING id",
        )
        .bind(&concept.term)
        .bind(&concept.definition)
        .bind(&embedding)
        .fetch_one(&mut **tx)
        .await?;
        ids.insert(concept.index, id.0);

        for node_index in &concept.nodes {
            let node_id = node_ids.get(node_index).ok_or_else(|| {
                DbError::Validation(format!(
                    "concept {} references unknown inode {node_index}",
                    concept.index
                ))
            })?;
            sqlx::query(
                r"INSERT INTO inode_concepts (node_id, concept_id, term)
                  VALUES ($1, $2, $3)
                  ON CONFLICT (node_id, term) DO NOTHING",
            )
            .bind(node_id)
            .bind(id.0)
            .bind(&concept.term)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(ids)
}

async fn insert_equivocations(
    tx: &mut Transaction<'_, Postgres>,
    graph: &AnalysisGraph,
    scheme_ids: &HashMap<u32, Uuid>,
    concept_ids: &HashMap<u32, Uuid>,
) -> Result<(), DbError> {
    for flag in &graph.equivocations {
        let scheme_id = scheme_ids.get(&flag.scheme).ok_or_else(|| {
            DbError::Validation(format!("flag references unknown scheme {}", flag.scheme))
        })?;
        let premise_concept = concept_ids.get(&flag.premise_concept).ok_or_else(|| {
            DbError::Validation(format!(
                "flag references unknown concept {}",
                flag.premise_concept
            ))
        })?;
        let conclusion_concept =
            concept_ids.get(&flag.conclusion_concept).ok_or_else(|| {
                DbError::Validation(format!(
                    "flag references unknown concept {}",
                    flag.conclusion_concept
                ))
            })?;
        sqlx::query(
            r"INSERT INTO equivocation_flags
                  (scheme_id, term, premise_concept_id, conclusion_concept_id)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (scheme_id, term) DO NOTHING",
        )
        .bind(scheme_id)
        .bind(&flag.term)
        .bind(premise_concept)
        .bind(conclusion_concept)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
