//! Request and response types for the AgentConnect HTTP API.
//!
//! This crate encodes the service's REST contract as Rust types so that
//! shape drift between the client and the service shows up at compile time
//! (or, for the service's side, as a decode error) rather than as a missing
//! key in an untyped map.
//!
//! # Endpoints covered
//!
//! All paths are relative to the API base (conventionally `…/api`).
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | POST | `/agents/register` | [`RegisterRequest`] → [`RegisterResponse`] |
//! | GET | `/agents` | [`ListQuery`] → [`AgentListResponse`] |
//! | GET | `/agents/{agent_id}` | → [`AgentRecord`] |
//! | PUT | `/agents/{agent_id}/status` | [`StatusUpdateRequest`] → [`AgentRecord`] |
//! | POST | `/messages/send` | [`SendMessageRequest`] → [`MessageReceipt`] |
//! | GET | `/messages/{message_id}` | → [`MessageReceipt`] |
//!
//! Every non-success response carries an [`ErrorResponse`] body.

pub mod agent;
pub mod error;
pub mod message;

pub use agent::{
    AgentListResponse, AgentRecord, ListQuery, RegisterRequest, RegisterResponse,
    StatusUpdateRequest,
};
pub use error::ErrorResponse;
pub use message::{MessageReceipt, SendMessageRequest};
