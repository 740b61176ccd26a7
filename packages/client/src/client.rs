//! The async transport client.
//!
//! [`AgentConnectClient`] turns each service operation into a single HTTP
//! request, attaches the bearer credential where the operation needs one,
//! and normalises the outcome into `Result<T, ClientError>`.
//!
//! # Request contract
//!
//! - Every request carries `Content-Type: application/json`.
//! - Operations that act on behalf of an agent (`update_status`,
//!   `send_message`, `get_message_status`) attach
//!   `Authorization: Bearer <key>` when a credential is held. Directory
//!   operations (`register`, `list_agents`, `get_agent`) never do, even when
//!   one is held.
//! - A 2xx response is decoded into the operation's result type. Anything
//!   else becomes [`ClientError::OperationFailed`] carrying the service's
//!   `detail` text, or a generic fallback when the body has none or is not
//!   JSON.
//!
//! The client makes exactly one attempt per call and sets no timeout of its
//! own. Pass a pre-configured `reqwest::Client` to
//! [`AgentConnectClient::with_http_client`] to get either.

use std::sync::Arc;

use agentconnect_api::{
    AgentListResponse, AgentRecord, ErrorResponse, ListQuery, MessageReceipt, RegisterRequest,
    RegisterResponse, SendMessageRequest, StatusUpdateRequest,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::endpoints::ApiEndpoints;
use crate::error::ClientError;

/// Whether an operation sends the held credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Anonymous,
    Bearer,
}

/// Client for the AgentConnect registry and messaging API.
///
/// Cheap to clone: clones share the HTTP connection pool and the credential
/// store, so a credential set through one clone is seen by all of them.
#[derive(Clone)]
pub struct AgentConnectClient {
    http: Client,
    endpoints: ApiEndpoints,
    credentials: Arc<dyn CredentialStore>,
}

impl AgentConnectClient {
    /// Create a client with a default `reqwest::Client`.
    pub fn new(api_base: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self::with_http_client(Client::new(), api_base, credentials)
    }

    /// Create a client on top of a caller-configured `reqwest::Client`
    /// (timeouts, proxies, TLS roots…).
    pub fn with_http_client(
        http: Client,
        api_base: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            endpoints: ApiEndpoints::new(api_base),
            credentials,
        }
    }

    /// Build a client from a [`ClientConfig`], opening its credential store.
    pub fn from_config(config: &ClientConfig, http: Client) -> Result<Self, ClientError> {
        let credentials = config.open_credential_store()?;
        Ok(Self::with_http_client(http, config.api_base.clone(), credentials))
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    // ── Credential holder ─────────────────────────────────────────────────────

    /// Activate and persist `token` for subsequent authenticated requests.
    pub fn set_credential(&self, token: &str) -> Result<(), ClientError> {
        self.credentials.set(token)?;
        Ok(())
    }

    /// Deactivate the credential and remove it from persistent storage.
    pub fn clear_credential(&self) -> Result<(), ClientError> {
        self.credentials.clear()?;
        Ok(())
    }

    /// Whether a credential is currently held.
    pub fn has_credential(&self) -> bool {
        self.credentials.get().is_some()
    }

    // ── Agent directory ───────────────────────────────────────────────────────

    /// `POST /agents/register`: register a new agent.
    ///
    /// On success the issued API key becomes the held credential. The
    /// response's `api_key` and `secret_token` are not retrievable again;
    /// the caller must keep `secret_token` to verify webhook deliveries.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidRequest`] if `name` is blank or `webhook_url`
    /// is not an absolute `http`/`https` URL. If the service accepted the
    /// registration but the key could not be persisted,
    /// [`ClientError::RegistrationNotPersisted`] carries the response.
    pub async fn register(
        &self,
        name: &str,
        description: &str,
        webhook_url: &str,
    ) -> Result<RegisterResponse, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::InvalidRequest("agent name must not be empty".into()));
        }
        validate_webhook_url(webhook_url)?;

        let body = RegisterRequest {
            name: name.to_string(),
            description: description.to_string(),
            webhook_url: webhook_url.to_string(),
        };
        let request = self
            .http
            .request(Method::POST, self.endpoints.register_url())
            .json(&body);
        let registration: RegisterResponse =
            self.execute("register", request, Auth::Anonymous).await?;

        if let Err(source) = self.credentials.set(&registration.api_key) {
            warn!(
                agent_id = %registration.agent_id,
                "register: failed to store issued API key: {source}"
            );
            return Err(ClientError::RegistrationNotPersisted {
                registration: Box::new(registration),
                source,
            });
        }
        debug!(agent_id = %registration.agent_id, "register: credential activated");
        Ok(registration)
    }

    /// `GET /agents`: list agents in the service's order.
    pub async fn list_agents(&self, query: &ListQuery) -> Result<Vec<AgentRecord>, ClientError> {
        Ok(self.list_agents_page(query).await?.agents)
    }

    /// `GET /agents`: like [`list_agents`](Self::list_agents) but keeps the
    /// service's `total` count for pagination.
    pub async fn list_agents_page(
        &self,
        query: &ListQuery,
    ) -> Result<AgentListResponse, ClientError> {
        let request = self
            .http
            .request(Method::GET, self.endpoints.agents_url())
            .query(query);
        self.execute("list_agents", request, Auth::Anonymous).await
    }

    /// `GET /agents/{agent_id}`: fetch one agent's directory entry.
    ///
    /// An unknown id fails with [`ClientError::OperationFailed`], status 404.
    pub async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord, ClientError> {
        let request = self
            .http
            .request(Method::GET, self.endpoints.agent_url(agent_id));
        self.execute("get_agent", request, Auth::Anonymous).await
    }

    /// `PUT /agents/{agent_id}/status`: change an agent's advertised status.
    ///
    /// `status` is passed through unchecked; the service decides which
    /// values it accepts.
    pub async fn update_status(
        &self,
        agent_id: &str,
        status: &str,
    ) -> Result<AgentRecord, ClientError> {
        let body = StatusUpdateRequest {
            status: status.to_string(),
        };
        let request = self
            .http
            .request(Method::PUT, self.endpoints.agent_status_url(agent_id))
            .json(&body);
        self.execute("update_status", request, Auth::Bearer).await
    }

    // ── Messaging ─────────────────────────────────────────────────────────────

    /// `POST /messages/send`: queue `content` for delivery to `to_agent_id`.
    ///
    /// Not idempotent: repeating a call after an ambiguous failure may
    /// deliver the message twice.
    pub async fn send_message<C>(
        &self,
        to_agent_id: &str,
        content: &C,
    ) -> Result<MessageReceipt, ClientError>
    where
        C: Serialize + ?Sized,
    {
        let message_content = serde_json::to_value(content).map_err(|e| {
            ClientError::InvalidRequest(format!("message content is not serialisable: {e}"))
        })?;
        let body = SendMessageRequest {
            to_agent_id: to_agent_id.to_string(),
            message_content,
        };
        let request = self
            .http
            .request(Method::POST, self.endpoints.send_message_url())
            .json(&body);
        self.execute("send_message", request, Auth::Bearer).await
    }

    /// `GET /messages/{message_id}`: current delivery status of a message.
    pub async fn get_message_status(&self, message_id: &str) -> Result<MessageReceipt, ClientError> {
        let request = self
            .http
            .request(Method::GET, self.endpoints.message_url(message_id));
        self.execute("get_message_status", request, Auth::Bearer).await
    }

    // ── Internal ──────────────────────────────────────────────────────────────

    /// Send one request and decode the outcome.
    ///
    /// The credential is read at this point, not when the builder was made.
    async fn execute<T: DeserializeOwned>(
        &self,
        op: &'static str,
        request: RequestBuilder,
        auth: Auth,
    ) -> Result<T, ClientError> {
        // `headers` replaces rather than appends, so bodies set with `.json()`
        // still carry a single Content-Type.
        let mut json_headers = HeaderMap::new();
        json_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut request = request.headers(json_headers);
        if auth == Auth::Bearer {
            if let Some(token) = self.credentials.get() {
                request = request.bearer_auth(token);
            }
        }

        debug!(op, "sending request");
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(op, status = status.as_u16(), bytes = body.len(), "received response");

        if !status.is_success() {
            let message = ErrorResponse::message_from_body(&body);
            warn!(op, status = status.as_u16(), "request failed: {message}");
            return Err(ClientError::OperationFailed {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

fn validate_webhook_url(raw: &str) -> Result<(), ClientError> {
    let url = Url::parse(raw)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid webhook URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        _ => Err(ClientError::InvalidRequest(format!(
            "webhook URL must be an absolute http(s) URL, got {raw:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
