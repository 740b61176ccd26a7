//! Messaging types: `POST /messages/send` and `GET /messages/{message_id}`.
//!
//! Messages are queued by the service and delivered asynchronously to the
//! recipient's webhook. The sender gets a receipt immediately and can poll
//! the message later for its delivery status.

use serde::{Deserialize, Serialize};

/// Request body for `POST /messages/send`.
///
/// The sender is implied by the bearer credential on the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendMessageRequest {
    /// Recipient agent id.
    pub to_agent_id: String,

    /// Arbitrary JSON content, delivered to the recipient unchanged.
    pub message_content: serde_json::Value,
}

/// Receipt for a sent message.
///
/// `POST /messages/send` returns only `message_id` and `status`;
/// `GET /messages/{message_id}` adds the delivery bookkeeping fields. Both
/// decode into this type.
///
/// # Example
///
/// ```json
/// {
///   "message_id": "msg_Zm9v",
///   "from_agent_id": "agent_a",
///   "to_agent_id": "agent_b",
///   "status": "failed",
///   "retry_count": 3,
///   "created_at": "2026-01-01T12:00:00",
///   "delivered_at": null,
///   "error_message": "Webhook returned 410: Gone"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageReceipt {
    pub message_id: String,

    /// Delivery status, e.g. `queued`, `delivered`, `failed`. Opaque.
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agent_id: Option<String>,

    /// Number of delivery attempts the service has retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<String>,

    /// Last delivery error reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl MessageReceipt {
    /// A bare receipt as returned by `POST /messages/send`.
    pub fn new(message_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            status: status.into(),
            from_agent_id: None,
            to_agent_id: None,
            retry_count: None,
            created_at: None,
            delivered_at: None,
            error_message: None,
        }
    }
}
