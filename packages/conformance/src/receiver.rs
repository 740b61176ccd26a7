//! Agent-side webhook endpoint used by the end-to-end tests.
//!
//! Each delivery is checked against the configured secret with
//! [`parse_verified_event`]. Verified events are queued for the test to
//! read; anything else gets a `401` and bumps [`WebhookReceiver::rejected_count`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use agentconnect::{parse_verified_event, WebhookEvent, SIGNATURE_HEADER};
use axum::{
    body::Bytes, extract::State, http::HeaderMap, http::StatusCode, routing::post, Router,
};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

#[derive(Clone)]
struct ReceiverState {
    secret: Arc<RwLock<Option<String>>>,
    events: mpsc::UnboundedSender<WebhookEvent>,
    rejected: Arc<AtomicUsize>,
}

/// Handle to a running webhook receiver.
pub struct WebhookReceiver {
    /// URL to register as the agent's `webhook_url`.
    pub url: String,
    secret: Arc<RwLock<Option<String>>>,
    events: Mutex<mpsc::UnboundedReceiver<WebhookEvent>>,
    rejected: Arc<AtomicUsize>,
}

impl WebhookReceiver {
    /// Secret to verify deliveries against. Until one is set every delivery
    /// is rejected.
    pub fn set_secret(&self, secret: impl Into<String>) {
        *self.secret.write().unwrap_or_else(PoisonError::into_inner) = Some(secret.into());
    }

    /// Wait up to `timeout` for the next verified event.
    pub async fn next_event(&self, timeout: Duration) -> Option<WebhookEvent> {
        let mut events = self.events.lock().await;
        tokio::time::timeout(timeout, events.recv()).await.ok().flatten()
    }

    /// Deliveries refused so far.
    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

async fn receive(State(state): State<ReceiverState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let secret = state
        .secret
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let verified = secret
        .as_deref()
        .and_then(|secret| parse_verified_event(&body, signature, secret).ok());

    match verified {
        Some(event) => {
            debug!("receiver: accepted {}", event.message_id);
            // The handle may already be gone at the end of a test.
            let _ = state.events.send(event);
            StatusCode::OK
        }
        None => {
            state.rejected.fetch_add(1, Ordering::SeqCst);
            StatusCode::UNAUTHORIZED
        }
    }
}

/// Start a webhook receiver on an ephemeral port.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_webhook_receiver() -> WebhookReceiver {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let (tx, rx) = mpsc::unbounded_channel();
    let state = ReceiverState {
        secret: Arc::default(),
        events: tx,
        rejected: Arc::default(),
    };

    let app = Router::new()
        .route("/hook", post(receive))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("webhook receiver error");
    });

    WebhookReceiver {
        url: format!("http://{addr}/hook"),
        secret: state.secret,
        events: Mutex::new(rx),
        rejected: state.rejected,
    }
}
