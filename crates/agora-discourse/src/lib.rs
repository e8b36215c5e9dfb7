//! HTTP client for the external discourse engine.
//!
//! The discourse engine embeds text and decomposes posts and replies into
//! typed argument graphs. It also runs asynchronous batch jobs whose
//! opaque job names the batch pipeline persists and re-polls across
//! restarts.
//!
//! # Modules
//!
//! - [`client`] -- the [`DiscourseClient`] with per-call timeouts
//! - [`error`] -- [`DiscourseError`]

pub mod client;
pub mod error;

pub use client::DiscourseClient;
pub use error::DiscourseError;
