//! Content hashing for analysis idempotency.
//!
//! Every analyzable piece of content carries an `analysis_content_hash`;
//! a run is uniquely keyed by (source, content hash), so re-analyzing
//! unchanged content is a no-op.

use sha2::{Digest, Sha256};

/// Compute the analysis content hash of a post (title + content).
///
/// The hash is `sha256` over the normalized text, hex-encoded lowercase.
pub fn post_content_hash(title: &str, content: &str) -> String {
    hash_normalized(&[title, content])
}

/// Compute the analysis content hash of a reply (content only).
pub fn reply_content_hash(content: &str) -> String {
    hash_normalized(&[content])
}

/// Normalization: trim each part, join with a single newline.
///
/// Whitespace-only edits therefore do not invalidate prior analyses.
fn hash_normalized(parts: &[&str]) -> String {
    let normalized = parts
        .iter()
        .map(|p| p.trim())
        .collect::<Vec<_>>()
        .join("\n");
    let digest = Sha256::digest(normalized.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        let h = post_content_hash("T", "C");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_ignores_surrounding_whitespace() {
        assert_eq!(
            post_content_hash("  Title ", "Body\n"),
            post_content_hash("Title", "Body")
        );
    }

    #[test]
    fn hash_distinguishes_title_from_content() {
        assert_ne!(post_content_hash("ab", "c"), post_content_hash("a", "bc"));
    }

    #[test]
    fn reply_hash_matches_known_vector() {
        // sha256("x")
        assert_eq!(
            reply_content_hash("x"),
            "2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881"
        );
    }
}
