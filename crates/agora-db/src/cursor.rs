//! Opaque cursor codec for keyset pagination.
//!
//! A feed cursor encodes the `(created_at, id)` pair of the last row on
//! the previous page as base64 of `"<micros>:<uuid>"`. Clients treat it
//! as opaque; decoding a malformed cursor is a validation failure, not an
//! internal error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::DbError;

/// A decoded keyset cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// `created_at` of the last row on the previous page.
    pub created_at: DateTime<Utc>,
    /// Id of the last row on the previous page (tie-breaker).
    pub id: Uuid,
}

impl Cursor {
    /// Encode into the opaque wire form.
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.created_at.timestamp_micros(), self.id);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Decode the opaque wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Validation`] on any malformed input.
    pub fn decode(raw: &str) -> Result<Self, DbError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| DbError::Validation("malformed cursor".to_owned()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| DbError::Validation("malformed cursor".to_owned()))?;
        let (micros_part, id_part) = text
            .split_once(':')
            .ok_or_else(|| DbError::Validation("malformed cursor".to_owned()))?;
        let micros: i64 = micros_part
            .parse()
            .map_err(|_| DbError::Validation("malformed cursor".to_owned()))?;
        let created_at = Utc
            .timestamp_micros(micros)
            .single()
            .ok_or_else(|| DbError::Validation("malformed cursor".to_owned()))?;
        let id: Uuid = id_part
            .parse()
            .map_err(|_| DbError::Validation("malformed cursor".to_owned()))?;
        Ok(Self { created_at, id })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let cursor = Cursor {
            created_at: Utc.timestamp_micros(1_722_470_400_123_456).single().unwrap(),
            id: Uuid::new_v4(),
        };
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Cursor::decode("not-base64!!!").is_err());
        assert!(Cursor::decode(&URL_SAFE_NO_PAD.encode("missing-separator")).is_err());
        assert!(Cursor::decode(&URL_SAFE_NO_PAD.encode("123:not-a-uuid")).is_err());
    }

    #[test]
    fn opaque_form_has_no_padding() {
        let cursor = Cursor {
            created_at: Utc::now(),
            id: Uuid::new_v4(),
        };
        assert!(!cursor.encode().contains('='));
    }
}
