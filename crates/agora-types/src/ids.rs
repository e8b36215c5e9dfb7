//! String-keyed identifier types.
//!
//! Entity rows (posts, replies, nodes, runs) use plain UUID v4 keys
//! generated by `uuid_generate_v4()` in the database. Two identifiers
//! are not UUIDs and get validating newtypes here: [`UserId`] (a stable
//! short string, lower-cased on write) and [`PipelineId`] (an
//! operator-chosen name for a batch pipeline run). Both are capped at
//! 64 characters.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Maximum length of the string-keyed identifiers.
pub const MAX_STRING_ID_LEN: usize = 64;

/// Stable short string identifier for a user.
///
/// At most [`MAX_STRING_ID_LEN`] characters, lower-cased on construction.
/// Users are never hard-deleted, so these identifiers are permanent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UserId(String);

impl UserId {
    /// Create a user ID, lower-casing the input.
    ///
    /// Returns `None` if the input is empty or longer than
    /// [`MAX_STRING_ID_LEN`] characters.
    pub fn new(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() || lowered.len() > MAX_STRING_ID_LEN {
            return None;
        }
        Some(Self(lowered))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operator-chosen identifier for one batch pipeline run.
///
/// A short string (at most [`MAX_STRING_ID_LEN`] characters), e.g.
/// `backfill-2026-08-01`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PipelineId(String);

impl PipelineId {
    /// Create a pipeline run ID.
    ///
    /// Returns `None` if the input is empty or longer than
    /// [`MAX_STRING_ID_LEN`] characters.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_STRING_ID_LEN {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_lowercases() {
        let id = UserId::new("Alice").map(UserId::into_inner);
        assert_eq!(id.as_deref(), Some("alice"));
    }

    #[test]
    fn user_id_rejects_empty_and_overlong() {
        assert!(UserId::new("").is_none());
        assert!(UserId::new("   ").is_none());
        assert!(UserId::new(&"x".repeat(65)).is_none());
        assert!(UserId::new(&"x".repeat(64)).is_some());
    }

    #[test]
    fn pipeline_id_preserves_case() {
        let id = PipelineId::new("Backfill-01");
        assert_eq!(id.as_ref().map(PipelineId::as_str), Some("Backfill-01"));
    }

    #[test]
    fn pipeline_id_rejects_blank() {
        assert!(PipelineId::new("  ").is_none());
    }
}
