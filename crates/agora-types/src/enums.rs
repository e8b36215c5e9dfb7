//! Closed vocabularies for the Agora platform.
//!
//! Every enum here has a fixed database string representation. The
//! `as_str` / `parse` pairs are the single source of truth for that
//! mapping; the data layer binds `as_str()` values and decodes `TEXT`
//! columns back through `parse`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates `as_str` and `parse` for an enum with fixed database strings.
macro_rules! db_strings {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $name {
            /// Database string representation of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            /// Parse the database string representation.
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($s => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Users and content
// ---------------------------------------------------------------------------

/// Kind of account behind a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    /// A human account.
    Human,
    /// An automated agent account (subject to agent limits unless
    /// `is_system` is set).
    Agent,
}

db_strings!(UserKind { Human => "human", Agent => "agent" });

/// The two votable / analyzable content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A top-level post.
    Post,
    /// A threaded reply.
    Reply,
}

db_strings!(TargetKind { Post => "post", Reply => "reply" });

/// Feed ranking functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    /// Score-ranked, newest first on ties, non-deleted only.
    Hot,
    /// Strict reverse-chronological.
    New,
    /// Highest score, ties broken by recency.
    Top,
    /// Most-voted posts created within the rising window.
    Rising,
    /// Heavily-voted posts whose score stays near zero.
    Controversial,
}

db_strings!(FeedSort {
    Hot => "hot",
    New => "new",
    Top => "top",
    Rising => "rising",
    Controversial => "controversial",
});

// ---------------------------------------------------------------------------
// Analysis runs
// ---------------------------------------------------------------------------

/// Lifecycle of one analysis run over one piece of content.
///
/// `Completed` and `Failed` are terminal; at most one non-terminal run may
/// exist per (source, content hash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Queued, not yet claimed by a worker.
    Pending,
    /// Claimed by a worker; stuck runs in this state are swept to `Failed`.
    Processing,
    /// Graph committed.
    Completed,
    /// Analysis failed or produced no nodes.
    Failed,
}

db_strings!(RunStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

impl RunStatus {
    /// Whether this status ends the run's lifecycle.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Hypergraph (V3)
// ---------------------------------------------------------------------------

/// Epistemic classification of an information node or enthymeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpistemicType {
    /// A claim about what is.
    Fact,
    /// A claim about what matters.
    Value,
    /// A claim about what should be done.
    Policy,
}

db_strings!(EpistemicType { Fact => "FACT", Value => "VALUE", Policy => "POLICY" });

/// Finer-grained classification of FACT nodes (V4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactSubtype {
    /// A reconstructed missing premise.
    Enthymeme,
    /// A first-person or anecdotal report.
    Anecdote,
    /// A reference to a non-academic document.
    DocumentRef,
    /// A reference to academic literature.
    AcademicRef,
}

db_strings!(FactSubtype {
    Enthymeme => "ENTHYMEME",
    Anecdote => "ANECDOTE",
    DocumentRef => "DOCUMENT_REF",
    AcademicRef => "ACADEMIC_REF",
});

/// Role of an information node derived from its outgoing premise edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeRole {
    /// Not a premise of any scheme.
    Root,
    /// Premise of at least one SUPPORT scheme.
    Support,
    /// Premise of at least one ATTACK scheme.
    Attack,
}

db_strings!(NodeRole { Root => "ROOT", Support => "SUPPORT", Attack => "ATTACK" });

/// Direction of a scheme node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemeDirection {
    /// The premises support the conclusion.
    Support,
    /// The premises attack the conclusion.
    Attack,
}

db_strings!(SchemeDirection { Support => "SUPPORT", Attack => "ATTACK" });

/// Role an edge plays within its scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum EdgeRole {
    /// Exactly one of (I-node, source) is the edge origin.
    Premise,
    /// Always an I-node.
    Conclusion,
    /// Always an I-node.
    Motivation,
}

db_strings!(EdgeRole {
    Premise => "premise",
    Conclusion => "conclusion",
    Motivation => "motivation",
});

/// Review status of a reconstructed missing premise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum EnthymemeStatus {
    /// Awaiting review.
    Pending,
    /// Accepted as the missing premise.
    Accepted,
    /// Rejected.
    Rejected,
}

db_strings!(EnthymemeStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

/// Hierarchy level of a source (R-node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceLevel {
    /// A whole domain (e.g. a publisher).
    Domain,
    /// A single document.
    Document,
    /// An extract within a document.
    Extract,
}

db_strings!(SourceLevel { Domain => "DOMAIN", Document => "DOCUMENT", Extract => "EXTRACT" });

// ---------------------------------------------------------------------------
// Gamification (V4)
// ---------------------------------------------------------------------------

/// Escrow lifecycle on a bridge scheme node.
///
/// ```text
/// none -> active -> { paid, stolen, languished }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    /// No bounty attached.
    None,
    /// Bounty posted, expiry pending.
    Active,
    /// Resolved by the original author before expiry.
    Paid,
    /// Resolved by another user before expiry.
    Stolen,
    /// Expired without resolution.
    Languished,
}

db_strings!(EscrowStatus {
    None => "none",
    Active => "active",
    Paid => "paid",
    Stolen => "stolen",
    Languished => "languished",
});

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Top-level notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    /// Reply-coalescing notifications.
    Social,
    /// Bounty / analysis lifecycle notifications.
    Epistemic,
}

db_strings!(NotificationCategory { Social => "SOCIAL", Epistemic => "EPISTEMIC" });

/// Subtype of an EPISTEMIC notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpistemicNotificationType {
    /// Analysis of the user's content halted.
    StreamHalted,
    /// Another user claimed the bounty first.
    BountyStolen,
    /// The bounty was paid out to the author.
    BountyPaid,
    /// The bounty expired unresolved.
    BountyLanguished,
    /// An upstream premise the user's argument relies on was defeated.
    UpstreamDefeated,
}

db_strings!(EpistemicNotificationType {
    StreamHalted => "STREAM_HALTED",
    BountyStolen => "BOUNTY_STOLEN",
    BountyPaid => "BOUNTY_PAID",
    BountyLanguished => "BOUNTY_LANGUISHED",
    UpstreamDefeated => "UPSTREAM_DEFEATED",
});

// ---------------------------------------------------------------------------
// Batch pipeline
// ---------------------------------------------------------------------------

/// Lifecycle of a batch pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// In progress; resumable after a cold restart.
    Running,
    /// All stages completed.
    Completed,
    /// A stage failed non-retriably.
    Failed,
}

db_strings!(PipelineStatus {
    Running => "running",
    Completed => "completed",
    Failed => "failed",
});

// ---------------------------------------------------------------------------
// Legacy V2 argument layer
// ---------------------------------------------------------------------------

/// Type of a legacy argument discourse unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum AduType {
    /// A claim.
    Claim,
    /// A premise.
    Premise,
}

db_strings!(AduType { Claim => "claim", Premise => "premise" });

/// Relation between two legacy argument discourse units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    /// The source unit supports the target.
    Support,
    /// The source unit attacks the target.
    Attack,
}

db_strings!(RelationType { Support => "support", Attack => "attack" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_roundtrip() {
        for status in [
            RunStatus::Pending,
            RunStatus::Processing,
            RunStatus::Completed,
            RunStatus::Failed,
        ] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("cancelled"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Processing.is_terminal());
    }

    #[test]
    fn serde_matches_db_strings() {
        let json = serde_json::to_string(&EpistemicType::Fact).unwrap_or_default();
        assert_eq!(json, "\"FACT\"");
        let json = serde_json::to_string(&EdgeRole::Premise).unwrap_or_default();
        assert_eq!(json, "\"premise\"");
        let json =
            serde_json::to_string(&EpistemicNotificationType::BountyLanguished).unwrap_or_default();
        assert_eq!(json, "\"BOUNTY_LANGUISHED\"");
        let json = serde_json::to_string(&FactSubtype::DocumentRef).unwrap_or_default();
        assert_eq!(json, "\"DOCUMENT_REF\"");
    }

    #[test]
    fn feed_sort_parse() {
        assert_eq!(FeedSort::parse("hot"), Some(FeedSort::Hot));
        assert_eq!(FeedSort::parse("controversial"), Some(FeedSort::Controversial));
        assert_eq!(FeedSort::parse("best"), None);
    }
}
