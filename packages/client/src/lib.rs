//! Async client SDK for the AgentConnect agent directory and messaging
//! service.
//!
//! Agents register with the service, advertise a status, discover each
//! other, and exchange messages that the service delivers asynchronously to
//! each recipient's webhook. This crate is the client half of that
//! contract:
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`client`] | [`AgentConnectClient`]: one method per service operation |
//! | [`credentials`] | [`CredentialStore`] and its memory/file implementations |
//! | [`endpoints`] | URL construction for each endpoint |
//! | [`config`] | [`ClientConfig::from_env`] |
//! | [`error`] | [`ClientError`] |
//!
//! Webhook verification lives in the `agentconnect` crate and is re-exported
//! here for convenience.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentconnect_client::{AgentConnectClient, MemoryCredentialStore};
//!
//! let client = AgentConnectClient::new(
//!     "http://localhost:8000/api",
//!     Arc::new(MemoryCredentialStore::new()),
//! );
//!
//! // Registration activates the issued API key on the client.
//! let reg = client.register("Researcher-7", "Summarises papers", "https://me.example/hook").await?;
//!
//! client.update_status(&reg.agent_id, "online").await?;
//! let receipt = client.send_message("agent_b", &serde_json::json!({"text": "hi"})).await?;
//! let later = client.get_message_status(&receipt.message_id).await?;
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod error;

pub use agentconnect::{parse_verified_event, verify_webhook_signature, WebhookEvent};
pub use agentconnect_api as api;
pub use client::AgentConnectClient;
pub use config::ClientConfig;
pub use credentials::{
    CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    OverrideCredentialStore, CREDENTIAL_KEY,
};
pub use endpoints::ApiEndpoints;
pub use error::ClientError;
