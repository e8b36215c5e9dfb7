//! Wire payloads for the external discourse engine.
//!
//! The discourse engine is an opaque HTTP JSON collaborator that embeds
//! text and decomposes content into a typed argument graph. Node-to-node
//! references inside one [`AnalysisGraph`] use small local indexes (the
//! engine does not know database identifiers); the graph writer assigns
//! real IDs when it commits the run.
//!
//! A missing analysis is represented by empty arrays, never by an error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{EdgeRole, EpistemicType, FactSubtype, SchemeDirection, SourceLevel, TargetKind};

// ---------------------------------------------------------------------------
// POST /embed
// ---------------------------------------------------------------------------

/// Request body for `POST /embed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// The texts to embed, in order.
    pub texts: Vec<String>,
}

/// Response body for `POST /embed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// One 1536-dimension vector per input text, in input order.
    pub embeddings_1536: Vec<Vec<f32>>,
}

// ---------------------------------------------------------------------------
// POST /analyze
// ---------------------------------------------------------------------------

/// Request body for `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// The full text to analyze (title + content for posts).
    pub text: String,
    /// Kind of the source content.
    pub source_type: TargetKind,
    /// Identifier of the source content.
    pub source_id: Uuid,
}

/// The typed graph payload returned by `POST /analyze`.
///
/// All arrays default to empty so the engine may omit sections it found
/// nothing for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnalysisGraph {
    /// Information nodes extracted from the text.
    #[serde(default)]
    pub inodes: Vec<InodePayload>,
    /// Scheme nodes (logic hubs).
    #[serde(default)]
    pub schemes: Vec<SchemePayload>,
    /// Edges connecting schemes to I-nodes or sources.
    #[serde(default)]
    pub edges: Vec<EdgePayload>,
    /// Reconstructed missing premises.
    #[serde(default)]
    pub enthymemes: Vec<EnthymemePayload>,
    /// Probing questions attached to uncertain schemes.
    #[serde(default)]
    pub socratic_questions: Vec<SocraticQuestionPayload>,
    /// Named values extracted from VALUE nodes.
    #[serde(default)]
    pub extracted_values: Vec<ExtractedValuePayload>,
    /// Concepts referenced by the I-nodes.
    #[serde(default)]
    pub concepts: Vec<ConceptPayload>,
    /// Same-term / different-concept flags across scheme edges.
    #[serde(default)]
    pub equivocations: Vec<EquivocationPayload>,
    /// Cited sources (R-nodes).
    #[serde(default)]
    pub sources: Vec<SourcePayload>,
}

impl AnalysisGraph {
    /// Whether the engine returned no analysis at all.
    ///
    /// A run whose graph is empty is marked failed by the worker.
    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty() && self.schemes.is_empty()
    }
}

/// One information node in an analysis payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InodePayload {
    /// Payload-local index, referenced by edges and concept maps.
    pub index: u32,
    /// The extracted text.
    pub content: String,
    /// Optional neutral rewrite of the extracted text.
    #[serde(default)]
    pub rewritten_content: Option<String>,
    /// FACT / VALUE / POLICY classification.
    pub epistemic_type: EpistemicType,
    /// Finer FACT classification, when applicable.
    #[serde(default)]
    pub fact_subtype: Option<FactSubtype>,
    /// Span start (inclusive) in the analyzed text.
    pub span_start: u32,
    /// Span end (exclusive); always greater than `span_start`.
    pub span_end: u32,
    /// Confidence of the FACT/VALUE/POLICY classification, in [0, 1].
    pub fvp_confidence: f32,
    /// Confidence of the span extraction, in [0, 1].
    pub extraction_confidence: f32,
    /// 1536-dimension embedding of the content.
    pub embedding: Vec<f32>,
}

/// One scheme node in an analysis payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SchemePayload {
    /// Payload-local index, referenced by edges.
    pub index: u32,
    /// SUPPORT or ATTACK.
    pub direction: SchemeDirection,
    /// Named argumentation scheme, when recognized.
    #[serde(default)]
    pub logic_type: Option<String>,
    /// Confidence in the scheme, in [0, 1].
    pub confidence: f32,
    /// Whether the engine detected a logical gap (missing premise).
    #[serde(default)]
    pub gap_detected: bool,
    /// Detected fallacy kind, when any.
    #[serde(default)]
    pub fallacy_type: Option<String>,
    /// Explanation of the detected fallacy.
    #[serde(default)]
    pub fallacy_explanation: Option<String>,
}

/// One edge in an analysis payload.
///
/// For `role = premise` exactly one of `node` / `source` is set; for
/// other roles only `node` is set.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EdgePayload {
    /// Local index of the scheme this edge belongs to.
    pub scheme: u32,
    /// Local index of the I-node origin, when the origin is an I-node.
    #[serde(default)]
    pub node: Option<u32>,
    /// Local index of the source origin, when the origin is a source.
    #[serde(default)]
    pub source: Option<u32>,
    /// Role of the edge within the scheme.
    pub role: EdgeRole,
}

/// One reconstructed missing premise.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EnthymemePayload {
    /// Local index of the scheme this premise is missing from.
    pub scheme: u32,
    /// The reconstructed premise text.
    pub content: String,
    /// FACT / VALUE / POLICY classification of the premise.
    pub epistemic_type: EpistemicType,
    /// Probability that the premise is genuinely assumed, in [0, 1].
    pub probability: f32,
}

/// One Socratic question attached to a scheme.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SocraticQuestionPayload {
    /// Local index of the scheme the question probes.
    pub scheme: u32,
    /// The question text.
    pub question: String,
    /// Uncertainty the question targets, in [0, 1].
    pub uncertainty: f32,
}

/// One named value extracted from a VALUE node.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExtractedValuePayload {
    /// Local index of the I-node the value was extracted from.
    pub node: u32,
    /// The value name (e.g. "fairness").
    pub value: String,
    /// Extraction confidence, in [0, 1].
    pub confidence: f32,
}

/// One concept referenced by the analyzed text.
///
/// Concepts are globally deduplicated by (term, definition) at write time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConceptPayload {
    /// Payload-local index, referenced by equivocation flags.
    pub index: u32,
    /// The surface term.
    pub term: String,
    /// The sense of the term as used here.
    pub definition: String,
    /// 1536-dimension embedding of the definition.
    pub embedding: Vec<f32>,
    /// Local indexes of the I-nodes that use the term in this sense.
    #[serde(default)]
    pub nodes: Vec<u32>,
}

/// One equivocation flag: the same term used in two senses across a
/// premise/conclusion edge of one scheme.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EquivocationPayload {
    /// Local index of the scheme the flag is on.
    pub scheme: u32,
    /// The equivocated term.
    pub term: String,
    /// Local concept index used on the premise side.
    pub premise_concept: u32,
    /// Local concept index used on the conclusion side.
    pub conclusion_concept: u32,
}

/// One cited source (R-node).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SourcePayload {
    /// Payload-local index, referenced by premise edges and I-nodes.
    pub index: u32,
    /// Hierarchy level of the source.
    pub level: SourceLevel,
    /// Canonical URL, when known. Unique across the system.
    #[serde(default)]
    pub url: Option<String>,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Local index of the parent source, when part of a hierarchy.
    #[serde(default)]
    pub parent: Option<u32>,
    /// Engine-estimated reputation, in [0, 1].
    pub reputation: f32,
}

// ---------------------------------------------------------------------------
// POST /batch/submit and GET /batch/poll
// ---------------------------------------------------------------------------

/// Request body for `POST /batch/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubmitRequest {
    /// Stage name (e.g. `stage1-fvp`), echoed in engine-side logs.
    pub stage: String,
    /// Stage-specific request objects, one per text.
    pub requests: Vec<serde_json::Value>,
}

/// Response body for `POST /batch/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubmitResponse {
    /// Opaque external job name, persisted as `gemini_job_name`.
    pub job: String,
}

/// Response body for `GET /batch/poll?job=...`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPollResponse {
    /// Whether the job has finished.
    pub done: bool,
    /// Parsed results, present once `done` is true and the job succeeded.
    #[serde(default)]
    pub results: Option<serde_json::Value>,
    /// Error description, present when the job failed.
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph_detection() {
        let graph = AnalysisGraph::default();
        assert!(graph.is_empty());
    }

    #[test]
    fn graph_with_only_optional_sections_is_still_empty() {
        let graph: AnalysisGraph = serde_json::from_str(r#"{"sources": []}"#).unwrap_or_default();
        assert!(graph.is_empty());
    }

    #[test]
    fn analysis_payload_deserializes_with_defaults() {
        let json = r#"{
            "inodes": [{
                "index": 0,
                "content": "Rising temperatures are measurable.",
                "epistemic_type": "FACT",
                "span_start": 0,
                "span_end": 35,
                "fvp_confidence": 0.93,
                "extraction_confidence": 0.88,
                "embedding": []
            }],
            "schemes": [{"index": 0, "direction": "SUPPORT", "confidence": 0.8}],
            "edges": [{"scheme": 0, "node": 0, "role": "premise"}]
        }"#;
        let graph: Result<AnalysisGraph, _> = serde_json::from_str(json);
        let graph = graph.unwrap_or_default();
        assert!(!graph.is_empty());
        assert_eq!(graph.inodes.len(), 1);
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.enthymemes.is_empty());
    }
}
