//! Webhook authentication for the AgentConnect agent directory.
//!
//! AgentConnect delivers messages to an agent by POSTing to the webhook URL
//! the agent registered with. Each delivery is signed with HMAC-SHA256 using
//! the secret token issued at registration. This crate holds both sides of
//! that protocol and has no I/O: it is shared by the client SDK, the CLI,
//! and any agent process that hosts a webhook endpoint.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`webhook`] | Signing and constant-time verification: [`verify_webhook_signature`] |
//! | [`event`] | The delivered payload: [`WebhookEvent`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use agentconnect::{parse_verified_event, verify_webhook_signature};
//!
//! // Inside an agent's webhook handler:
//! if !verify_webhook_signature(&raw_body, &x_signature, &secret_token) {
//!     return StatusCode::UNAUTHORIZED;
//! }
//!
//! // Or verify and decode in one step.
//! let event = parse_verified_event(raw_body.as_bytes(), &x_signature, &secret_token)?;
//! println!("{} says {}", event.from_agent_id, event.message_content);
//! ```

pub mod event;
pub mod webhook;

pub use event::WebhookEvent;
pub use webhook::{
    compute_signature, parse_verified_event, signature_header_value, verify_bytes,
    verify_webhook_signature, WebhookError, SIGNATURE_HEADER, SIGNATURE_PREFIX,
};
