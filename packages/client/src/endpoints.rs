//! URL construction for every service endpoint.
//!
//! [`ApiEndpoints`] is pure computation: it turns an API base and opaque ids
//! into request URLs and leaves the HTTP calls to the client. Ids are
//! percent-encoded as single path segments so an id containing `/` or `?`
//! can never address a different resource.

use urlencoding::encode;

/// URL helpers rooted at the service's API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// API base URL including the `/api` path, e.g. `http://localhost:8000/api`.
    /// Stored without a trailing slash.
    pub api_base: String,
}

impl ApiEndpoints {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    // ── Agent endpoints ───────────────────────────────────────────────────────

    /// `{api_base}/agents/register`
    pub fn register_url(&self) -> String {
        format!("{}/agents/register", self.api_base)
    }

    /// `{api_base}/agents`. Filters travel as query parameters.
    pub fn agents_url(&self) -> String {
        format!("{}/agents", self.api_base)
    }

    /// `{api_base}/agents/{agent_id_encoded}`
    pub fn agent_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{}", self.api_base, encode(agent_id))
    }

    /// `{api_base}/agents/{agent_id_encoded}/status`
    pub fn agent_status_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{}/status", self.api_base, encode(agent_id))
    }

    // ── Message endpoints ─────────────────────────────────────────────────────

    /// `{api_base}/messages/send`
    pub fn send_message_url(&self) -> String {
        format!("{}/messages/send", self.api_base)
    }

    /// `{api_base}/messages/{message_id_encoded}`
    pub fn message_url(&self, message_id: &str) -> String {
        format!("{}/messages/{}", self.api_base, encode(message_id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
