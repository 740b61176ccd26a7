//! Standard error response body.

use serde::{Deserialize, Serialize};

/// Message used when a failed response carries no usable `detail`.
pub const FALLBACK_DETAIL: &str = "Request failed";

/// The JSON body the service returns for error responses.
///
/// ```json
/// { "detail": "Agent not found" }
/// ```
///
/// `detail` is usually a string. Request validation failures carry a
/// structured list instead, so the field is kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] with a plain-text detail.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(serde_json::Value::String(detail.into())),
        }
    }

    /// Human-readable message for display.
    ///
    /// A string `detail` is returned verbatim; any other non-null `detail`
    /// is rendered as compact JSON; an absent or null one yields
    /// [`FALLBACK_DETAIL`].
    pub fn message(&self) -> String {
        match &self.detail {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => FALLBACK_DETAIL.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Extract the message from an arbitrary response body.
    ///
    /// Bodies that are not JSON objects fall back to [`FALLBACK_DETAIL`].
    pub fn message_from_body(body: &[u8]) -> String {
        serde_json::from_slice::<ErrorResponse>(body)
            .map(|e| e.message())
            .unwrap_or_else(|_| FALLBACK_DETAIL.to_string())
    }
}
