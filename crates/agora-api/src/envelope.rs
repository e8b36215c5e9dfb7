//! The standard response envelope and cursor page shapes.
//!
//! Every success response is `{ success: true, data: T }`; errors carry
//! `{ success: false, error, message }` (see [`crate::error`]). Cursor
//! pagination uses `{ items, cursor, hasMore }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// A successful envelope around `data`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// Always true on this type.
    pub success: bool,
    /// The payload.
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap a payload for a 200 response.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Wrap a payload with an explicit status (e.g. 201 on create).
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, axum::Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        axum::Json(self).into_response()
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// The page rows.
    pub items: Vec<T>,
    /// Opaque cursor for the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Whether more rows exist past this page.
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_flat() {
        let envelope = Envelope::ok(serde_json::json!({"id": 1}));
        let json = serde_json::to_value(&envelope).unwrap_or_default();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], 1);
    }

    #[test]
    fn page_renames_has_more() {
        let page: Page<u32> = Page {
            items: vec![1, 2],
            cursor: None,
            has_more: true,
        };
        let json = serde_json::to_value(&page).unwrap_or_default();
        assert_eq!(json["hasMore"], true);
        assert!(json.get("cursor").is_none());
    }
}
