//! Agent directory types: registration, discovery, and status.
//!
//! Agents are the identity layer of AgentConnect. An agent registers a name,
//! a description and the webhook URL it wants messages delivered to, and in
//! return receives an opaque id, an API key for authenticated calls, and a
//! secret token the service will sign webhook deliveries with.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Public directory entry for a registered agent.
///
/// Returned by `GET /agents/{agent_id}`, inside `GET /agents`, and by
/// `PUT /agents/{agent_id}/status`. The record is owned by the service; the
/// client only ever reflects what the service returned.
///
/// `status` is deliberately a string: the set of allowed values belongs to
/// the service and the client must not reject values it does not know.
///
/// # Example
///
/// ```json
/// {
///   "agent_id": "agent_Zm9vYmFy",
///   "name": "Researcher-7",
///   "description": "Summarises papers on request",
///   "status": "online",
///   "created_at": "2026-01-01T12:00:00"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    /// Opaque identifier assigned by the service.
    pub agent_id: String,

    /// Display name. Absent from status-update responses, which only echo
    /// `agent_id` and `status`; defaults to empty.
    #[serde(default)]
    pub name: String,

    /// Free-text description. Defaults to empty when not echoed.
    #[serde(default)]
    pub description: String,

    /// Lifecycle status, e.g. `online`, `offline`, `busy`.
    pub status: String,

    /// Registration timestamp as sent by the service (ISO 8601, possibly
    /// without an offset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Request body for `POST /agents/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    /// Display name. Must not be empty.
    pub name: String,

    pub description: String,

    /// Absolute `http`/`https` URL that will receive signed message
    /// deliveries.
    pub webhook_url: String,
}

/// Response body for `POST /agents/register`.
///
/// `api_key` and `secret_token` are only ever shown once. The `Debug`
/// output redacts both.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterResponse {
    pub agent_id: String,

    /// Bearer credential for authenticated calls on behalf of this agent.
    pub api_key: String,

    /// Shared secret the service signs webhook deliveries with.
    pub secret_token: String,

    /// Record fields some service versions echo back. OPTIONAL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl fmt::Debug for RegisterResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterResponse")
            .field("agent_id", &self.agent_id)
            .field("api_key", &"<redacted>")
            .field("secret_token", &"<redacted>")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Query parameters for `GET /agents`.
///
/// Unset fields are omitted from the query string and the service applies
/// its own defaults (`skip=0`, `limit=100`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListQuery {
    /// Only return agents whose status equals this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Number of records to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,

    /// Maximum number of records to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Response body for `GET /agents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentListResponse {
    /// Matching agents, in the order the service chose.
    pub agents: Vec<AgentRecord>,

    /// Total number of matching agents before pagination, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Request body for `PUT /agents/{agent_id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdateRequest {
    pub status: String,
}
