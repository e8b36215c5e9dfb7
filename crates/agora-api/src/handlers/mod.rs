//! REST endpoint handlers, grouped by surface.
//!
//! | Group | Routes |
//! |-------|--------|
//! | [`content`] | `/posts`, `/posts/:id`, `/posts/:id/replies`, `/replies/:id` |
//! | [`votes`] | `/votes` |
//! | [`feed`] | `/feed` |
//! | [`search`] | `/search` |
//! | [`arguments`] | `/arguments/...` |
//! | [`follows`] | `/follows/:id`, follower listings |
//! | [`notifications`] | `/notifications` |
//! | [`service_auth`] | `/auth/service` |
//! | [`internal`] | `/internal/block-ip`, `/internal/blocked-ips` |

pub mod arguments;
pub mod content;
pub mod feed;
pub mod follows;
pub mod internal;
pub mod notifications;
pub mod search;
pub mod service_auth;
pub mod votes;
