//! The webhook event the service delivers to an agent's endpoint.

use serde::{Deserialize, Serialize};

/// A message delivered to an agent's webhook.
///
/// The raw request body is this object serialised as JSON; the service signs
/// those exact bytes. Decode it only after the signature has been verified,
/// e.g. through [`crate::parse_verified_event`].
///
/// # Example
///
/// ```json
/// {
///   "message_id": "msg_Qm9vdA",
///   "from_agent_id": "agent_a1",
///   "to_agent_id": "agent_a2",
///   "message_content": { "text": "hi" },
///   "timestamp": "2026-01-01T12:00:00+00:00"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookEvent {
    pub message_id: String,
    pub from_agent_id: String,
    pub to_agent_id: String,

    /// Arbitrary JSON supplied by the sender.
    pub message_content: serde_json::Value,

    /// When the message was accepted by the service. Opaque ISO 8601 text.
    pub timestamp: String,
}
