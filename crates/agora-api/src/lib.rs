//! Public HTTP API for the Agora discussion platform.
//!
//! A thin Axum layer over the data stores: request validation, bearer
//! auth, the standard `{ success, data?, error?, message? }` envelope,
//! cursor pagination, and the error-kind table of the public contract.
//! The interesting work happens in `agora-db` and `agora-analysis`; this
//! crate routes to it.
//!
//! # Modules
//!
//! - [`router`] -- route table and middleware stack
//! - [`handlers`] -- endpoint implementations, grouped by surface
//! - [`auth`] -- session JWTs, the identity-token exchange, [`auth::AuthUser`]
//! - [`caches`] -- service-account allowlist + TTL IP blocklist
//! - [`envelope`] -- response envelope and page shapes
//! - [`error`] -- [`ApiError`] and its HTTP mapping
//! - [`state`] -- shared [`state::AppState`]
//! - [`server`] -- bind-and-serve lifecycle

pub mod auth;
pub mod caches;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use caches::{AllowlistCache, IpBlocklist};
pub use error::ApiError;
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::{AppState, AuthSettings};
