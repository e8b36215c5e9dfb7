//! Analysis pipeline for the Agora discussion platform.
//!
//! Content written to the platform flows through here asynchronously:
//! the worker drains pending analysis runs through the discourse engine
//! into the hypergraph, the batch orchestrator processes large content
//! sets with resumable per-stage checkpoints, and the gamification
//! engine maintains node roles, components, bridge escrows, and the
//! daily karma yields.
//!
//! # Modules
//!
//! - [`worker`] -- per-run analysis worker (claim, analyze, commit)
//! - [`staleness`] -- sweeper over stuck and empty runs
//! - [`pipeline`] -- multi-stage batch orchestrator with resume
//! - [`checkpoint`] -- write-once checkpoint blobs with retried reads
//! - [`components`] -- union-find partitioning and bridge detection
//! - [`backfill`] -- enthymeme reply reconstruction
//! - [`karma`] -- the nightly karma batch
//! - [`scheduler`] -- cron-driven batch scheduling
//! - [`error`] -- shared error type

pub mod backfill;
pub mod checkpoint;
pub mod components;
pub mod error;
pub mod karma;
pub mod pipeline;
pub mod scheduler;
pub mod staleness;
pub mod worker;

pub use checkpoint::CheckpointStorage;
pub use components::{partition, Bridge, Partition, SchemeNodes};
pub use error::AnalysisError;
pub use karma::{KarmaBatch, KarmaBatchSummary};
pub use pipeline::{PipelineOrchestrator, STAGES};
pub use scheduler::{KarmaScheduler, DEFAULT_KARMA_SCHEDULE};
pub use staleness::{StalenessSweeper, DEFAULT_STALENESS_THRESHOLD_SECS};
pub use worker::AnalysisWorker;
