//! `PostgreSQL` data layer for the Agora discussion platform.
//!
//! One schema holds the social surface (users, posts, threaded replies,
//! votes, follows, notifications), the V3 argument hypergraph with its
//! analysis-run tracker, the legacy V2 argument tables, the V4
//! gamification state, the batch pipeline checkpoints, and the HNSW
//! embedding indexes.
//!
//! Denormalized counters (scores, vote counts, reply counts, follower
//! counts, canonical-claim counts) are maintained by database triggers so
//! that every writer sees consistent counts without coordinating in
//! application code. Stores never write counter columns directly.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool and migrations
//! - [`content_store`] -- posts and threaded replies (materialized paths)
//! - [`vote_store`] -- idempotent per-(user, target) voting
//! - [`feed`] -- hot / new / top / rising / controversial ranking
//! - [`notification_store`] -- unified SOCIAL + EPISTEMIC inbox
//! - [`follow_store`] -- follow graph
//! - [`user_store`] -- user records and the system account
//! - [`run_store`] -- analysis run state machine
//! - [`graph_store`] -- V3 hypergraph transactional writes
//! - [`gamification_store`] -- V4 escrow, evidence ranks, karma
//! - [`claim_store`] -- legacy V2 ADUs and canonical claims
//! - [`pipeline_store`] -- batch pipeline runs and checkpoints
//! - [`embedding_store`] -- HNSW nearest-neighbor queries
//! - [`cursor`] / [`hash`] / [`vector`] -- pure codec helpers
//! - [`error`] -- shared error type

pub mod claim_store;
pub mod content_store;
pub mod cursor;
pub mod embedding_store;
pub mod error;
pub mod feed;
pub mod follow_store;
pub mod gamification_store;
pub mod graph_store;
pub mod hash;
pub mod notification_store;
pub mod pipeline_store;
pub mod postgres;
pub mod run_store;
pub mod user_store;
pub mod vector;
pub mod vote_store;

// Re-export primary types for convenience.
pub use claim_store::{AduRow, ClaimRow, ClaimStore, RelatedPost, RelationRow};
pub use content_store::{ContentStore, PostRow, Quote, ReplyPage, ReplyRow};
pub use cursor::Cursor;
pub use embedding_store::{ContentHit, EmbeddingStore, VectorHit};
pub use error::DbError;
pub use feed::{FeedPage, FeedRanker};
pub use follow_store::{FollowEntry, FollowStore};
pub use gamification_store::{
    DefeatedNode, DownstreamParty, EscrowParties, GamificationStore, KarmaDelta,
};
pub use graph_store::{
    EdgeRow, EnthymemeRow, GraphStore, GraphWriteSummary, InodeRow, SchemeRow,
};
pub use notification_store::{NotificationRow, NotificationStore};
pub use pipeline_store::{CheckpointRow, PipelineRunRow, PipelineStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use run_store::{RunRow, RunStore};
pub use user_store::{UserRow, UserStore};
pub use vote_store::{VoteRow, VoteStore};
