//! Shared type definitions for the Agora discussion platform.
//!
//! Agora threads user-authored posts and replies, lets users vote on them,
//! and asynchronously decomposes content into a typed argument hypergraph
//! (information nodes, scheme nodes, edges, enthymemes, concepts, sources)
//! against which a karma economy and a semantic feed are computed.
//!
//! This crate holds the vocabulary shared by every other crate:
//!
//! - [`ids`] -- strongly-typed identifier newtypes
//! - [`enums`] -- closed vocabularies (epistemic types, scheme directions,
//!   run statuses, escrow states, ...)
//! - [`discourse`] -- wire payloads exchanged with the external discourse
//!   engine (embedding + analysis service)

pub mod discourse;
pub mod enums;
pub mod ids;

pub use discourse::{
    AnalysisGraph, AnalyzeRequest, BatchPollResponse, BatchSubmitRequest, BatchSubmitResponse,
    ConceptPayload,
    EdgePayload, EmbedRequest, EmbedResponse, EnthymemePayload, EquivocationPayload,
    ExtractedValuePayload, InodePayload, SchemePayload, SocraticQuestionPayload, SourcePayload,
};
pub use enums::{
    AduType, EdgeRole, EnthymemeStatus, EpistemicNotificationType, EpistemicType, EscrowStatus,
    FactSubtype, FeedSort, NodeRole, NotificationCategory, PipelineStatus, RelationType,
    RunStatus, SchemeDirection, SourceLevel, TargetKind, UserKind,
};
pub use ids::{PipelineId, UserId};

/// Dimension of every embedding vector in the system.
///
/// Must match the `vector(1536)` columns in the database schema; the server
/// refuses to start when configured otherwise.
pub const EMBEDDING_DIMENSION: usize = 1536;
