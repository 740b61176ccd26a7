//! In-process stub of the AgentConnect registry and messaging service.
//!
//! Behaviour follows the service's public contract closely enough for the
//! client to be exercised end to end:
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | POST | `/api/agents/register` | none | issues `a<n>`, `k<n>`, `s<n>`; status starts `offline` |
//! | GET | `/api/agents` | none | `status`, `skip`, `limit` query; registration order |
//! | GET | `/api/agents/{id}` | none | 404 `Agent not found` |
//! | PUT | `/api/agents/{id}/status` | bearer | own agent only; echoes `{agent_id, status}` |
//! | POST | `/api/messages/send` | bearer | issues `m<n>`, queues, delivers to webhook once |
//! | GET | `/api/messages/{id}` | bearer | sender or recipient only |
//!
//! Any status string is accepted. Errors use the service's `{"detail": …}`
//! body. Every routed request is recorded before it is handled.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use agentconnect::{signature_header_value, WebhookEvent, SIGNATURE_HEADER};
use agentconnect_api::{
    AgentListResponse, AgentRecord, ErrorResponse, ListQuery, MessageReceipt, RegisterRequest,
    RegisterResponse, SendMessageRequest, StatusUpdateRequest,
};
use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Recorded requests
// ---------------------------------------------------------------------------

/// One request as the stub received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    /// Body bytes as text, exactly as sent.
    pub raw_body: String,
    /// Body parsed as JSON, when it was JSON.
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct StoredAgent {
    record: AgentRecord,
    webhook_url: String,
    secret_token: String,
}

#[derive(Default)]
struct Inner {
    /// Registration order.
    agents: Vec<StoredAgent>,
    /// API key → agent id.
    api_keys: HashMap<String, String>,
    messages: HashMap<String, MessageReceipt>,
    requests: Vec<RecordedRequest>,
    next_agent: u64,
    next_message: u64,
}

impl Inner {
    fn agent(&self, agent_id: &str) -> Option<&StoredAgent> {
        self.agents.iter().find(|a| a.record.agent_id == agent_id)
    }

    fn agent_mut(&mut self, agent_id: &str) -> Option<&mut StoredAgent> {
        self.agents.iter_mut().find(|a| a.record.agent_id == agent_id)
    }
}

#[derive(Clone)]
struct StubState {
    inner: Arc<RwLock<Inner>>,
    http: reqwest::Client,
}

impl StubState {
    fn lock(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

enum StubError {
    NotFound(&'static str),
    Unauthorized(&'static str),
    Forbidden(&'static str),
    Unprocessable(String),
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            StubError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            StubError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            StubError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.to_string()),
            StubError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        (status, Json(ErrorResponse::new(detail))).into_response()
    }
}

/// Resolve the bearer key to an agent id.
fn authenticate(state: &StubState, headers: &HeaderMap) -> Result<String, StubError> {
    let key = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StubError::Unauthorized("Not authenticated"))?;
    state
        .lock()
        .api_keys
        .get(key)
        .cloned()
        .ok_or(StubError::Unauthorized("Invalid API key"))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn register(
    State(state): State<StubState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, StubError> {
    if req.name.trim().is_empty() {
        return Err(StubError::Unprocessable("name must not be empty".into()));
    }
    if !(req.webhook_url.starts_with("http://") || req.webhook_url.starts_with("https://")) {
        return Err(StubError::Unprocessable(format!(
            "webhook_url is not a valid URL: {}",
            req.webhook_url
        )));
    }

    let mut inner = state.lock();
    inner.next_agent += 1;
    let n = inner.next_agent;
    let (agent_id, api_key, secret_token) = (format!("a{n}"), format!("k{n}"), format!("s{n}"));

    inner.agents.push(StoredAgent {
        record: AgentRecord {
            agent_id: agent_id.clone(),
            name: req.name,
            description: req.description,
            status: "offline".into(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        },
        webhook_url: req.webhook_url,
        secret_token: secret_token.clone(),
    });
    inner.api_keys.insert(api_key.clone(), agent_id.clone());
    debug!("stub: registered {agent_id}");

    Ok(Json(RegisterResponse {
        agent_id,
        api_key,
        secret_token,
        name: None,
        description: None,
        status: None,
        created_at: None,
    }))
}

async fn list_agents(
    State(state): State<StubState>,
    Query(query): Query<ListQuery>,
) -> Json<AgentListResponse> {
    let inner = state.lock();
    let matching: Vec<&AgentRecord> = inner
        .agents
        .iter()
        .map(|a| &a.record)
        .filter(|r| query.status.as_ref().map_or(true, |s| &r.status == s))
        .collect();
    let total = matching.len() as u64;
    let agents = matching
        .into_iter()
        .skip(query.skip.unwrap_or(0) as usize)
        .take(query.limit.unwrap_or(100) as usize)
        .cloned()
        .collect();
    Json(AgentListResponse {
        agents,
        total: Some(total),
    })
}

async fn get_agent(
    State(state): State<StubState>,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentRecord>, StubError> {
    state
        .lock()
        .agent(&agent_id)
        .map(|a| Json(a.record.clone()))
        .ok_or(StubError::NotFound("Agent not found"))
}

async fn update_status(
    State(state): State<StubState>,
    Path(agent_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, StubError> {
    let caller = authenticate(&state, &headers)?;
    if caller != agent_id {
        return Err(StubError::Forbidden("Can only update your own status"));
    }
    let mut inner = state.lock();
    let agent = inner
        .agent_mut(&agent_id)
        .ok_or(StubError::NotFound("Agent not found"))?;
    agent.record.status = req.status.clone();
    Ok(Json(json!({ "agent_id": agent_id, "status": req.status })))
}

async fn send_message(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageReceipt>, StubError> {
    let sender = authenticate(&state, &headers)?;

    let (receipt, webhook_url, secret_token) = {
        let mut inner = state.lock();
        let (webhook_url, secret_token) = inner
            .agent(&req.to_agent_id)
            .map(|a| (a.webhook_url.clone(), a.secret_token.clone()))
            .ok_or(StubError::NotFound("Recipient agent not found"))?;

        inner.next_message += 1;
        let message_id = format!("m{}", inner.next_message);
        let mut receipt = MessageReceipt::new(&message_id, "queued");
        receipt.from_agent_id = Some(sender);
        receipt.to_agent_id = Some(req.to_agent_id.clone());
        receipt.retry_count = Some(0);
        receipt.created_at = Some(chrono::Utc::now().to_rfc3339());
        inner.messages.insert(message_id, receipt.clone());
        (receipt, webhook_url, secret_token)
    };

    tokio::spawn(deliver(
        state.clone(),
        receipt.clone(),
        req.message_content,
        webhook_url,
        secret_token,
    ));

    Ok(Json(MessageReceipt::new(receipt.message_id, receipt.status)))
}

async fn get_message(
    State(state): State<StubState>,
    Path(message_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageReceipt>, StubError> {
    let caller = authenticate(&state, &headers)?;
    let inner = state.lock();
    let receipt = inner
        .messages
        .get(&message_id)
        .ok_or(StubError::NotFound("Message not found"))?;
    let involved = receipt.from_agent_id.as_deref() == Some(caller.as_str())
        || receipt.to_agent_id.as_deref() == Some(caller.as_str());
    if !involved {
        return Err(StubError::Forbidden("Not authorized to view this message"));
    }
    Ok(Json(receipt.clone()))
}

/// POST the signed event to the recipient's webhook once and record the outcome.
async fn deliver(
    state: StubState,
    receipt: MessageReceipt,
    content: Value,
    webhook_url: String,
    secret_token: String,
) {
    let event = WebhookEvent {
        message_id: receipt.message_id.clone(),
        from_agent_id: receipt.from_agent_id.clone().unwrap_or_default(),
        to_agent_id: receipt.to_agent_id.clone().unwrap_or_default(),
        message_content: content,
        timestamp: receipt.created_at.clone().unwrap_or_default(),
    };
    let payload = match serde_json::to_string(&event) {
        Ok(p) => p,
        Err(e) => {
            warn!("stub: cannot serialise event {}: {e}", event.message_id);
            return;
        }
    };
    let signature = signature_header_value(payload.as_bytes(), secret_token.as_bytes());

    let outcome = state
        .http
        .post(&webhook_url)
        .header("Content-Type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header("User-Agent", "AgentConnect/1.0")
        .body(payload)
        .send()
        .await;

    let error = match outcome {
        Ok(resp) if resp.status().is_success() => None,
        Ok(resp) => Some(format!("Webhook returned {}", resp.status().as_u16())),
        Err(e) => Some(format!("Could not connect to webhook URL: {e}")),
    };

    let mut inner = state.lock();
    if let Some(stored) = inner.messages.get_mut(&event.message_id) {
        match error {
            None => {
                stored.status = "delivered".into();
                stored.delivered_at = Some(chrono::Utc::now().to_rfc3339());
            }
            Some(msg) => {
                debug!("stub: delivery of {} failed: {msg}", event.message_id);
                stored.status = "failed".into();
                stored.error_message = Some(msg);
            }
        }
    }
}

/// Record every routed request, then hand it on unchanged.
async fn record_request(State(state): State<StubState>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    state.lock().requests.push(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers,
        raw_body: String::from_utf8_lossy(&bytes).into_owned(),
        body: serde_json::from_slice(&bytes).ok(),
    });
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

// ---------------------------------------------------------------------------
// StubService
// ---------------------------------------------------------------------------

/// Handle to a running stub service.
pub struct StubService {
    /// API base to point the client at, e.g. `http://127.0.0.1:51234/api`.
    pub api_base: String,
    state: StubState,
}

impl StubService {
    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// The webhook secret issued to `agent_id`.
    pub fn secret_token(&self, agent_id: &str) -> Option<String> {
        self.state
            .lock()
            .agent(agent_id)
            .map(|a| a.secret_token.clone())
    }
}

/// Start the stub on an ephemeral port and return its handle.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_stub_service() -> StubService {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let state = StubState {
        inner: Arc::default(),
        http: reqwest::Client::new(),
    };

    let app = Router::new()
        .route("/api/agents/register", post(register))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/{agent_id}", get(get_agent))
        .route("/api/agents/{agent_id}/status", put(update_status))
        .route("/api/messages/send", post(send_message))
        .route("/api/messages/{message_id}", get(get_message))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub service error");
    });

    StubService {
        api_base: format!("http://{addr}/api"),
        state,
    }
}
