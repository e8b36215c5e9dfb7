//! Text encoding for `pgvector` values.
//!
//! Embeddings cross the wire as `[x,y,...]` literals bound as text and
//! cast with `$n::vector` in SQL; reads select `embedding::text` back.
//! This mirrors how the rest of the crate handles `PostgreSQL` enums
//! (bind a string, cast in SQL) and keeps the vector extension entirely
//! inside the schema.

use crate::error::DbError;

/// Encode an embedding as a `pgvector` literal.
pub fn encode(embedding: &[f32]) -> String {
    let mut out = String::with_capacity(embedding.len().saturating_mul(10).saturating_add(2));
    out.push('[');
    for (i, value) in embedding.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!("{value}"));
    }
    out.push(']');
    out
}

/// Decode a `vector::text` column back into an embedding.
///
/// # Errors
///
/// Returns [`DbError::Decode`] if the literal is malformed.
pub fn decode(literal: &str) -> Result<Vec<f32>, DbError> {
    let inner = literal
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| DbError::Decode(format!("not a vector literal: {literal:.32}")))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| DbError::Decode(format!("bad vector component: {e}")))
        })
        .collect()
}

/// Validate that an embedding has the expected dimension.
///
/// # Errors
///
/// Returns [`DbError::Validation`] on a mismatch.
pub fn check_dimension(embedding: &[f32], expected: usize) -> Result<(), DbError> {
    if embedding.len() == expected {
        Ok(())
    } else {
        Err(DbError::Validation(format!(
            "embedding dimension {} does not match schema dimension {expected}",
            embedding.len()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let v = vec![0.25_f32, -1.0, 3.5];
        let encoded = encode(&v);
        assert_eq!(encoded, "[0.25,-1,3.5]");
        assert_eq!(decode(&encoded).unwrap(), v);
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(decode("0.25,-1").is_err());
        assert!(decode("[a,b]").is_err());
    }

    #[test]
    fn empty_vector() {
        assert_eq!(decode("[]").unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn dimension_check() {
        assert!(check_dimension(&[0.0; 1536], 1536).is_ok());
        assert!(check_dimension(&[0.0; 3], 1536).is_err());
    }
}
