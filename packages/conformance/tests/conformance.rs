//! End-to-end tests for the AgentConnect client SDK.
//!
//! Each test spawns an in-process stub of the service (real TCP, real HTTP)
//! via [`agentconnect_conformance::spawn_stub_service`] and drives it with
//! the real [`AgentConnectClient`]. Tests that need webhook delivery also
//! spawn a [`agentconnect_conformance::spawn_webhook_receiver`] and register
//! its URL.
//!
//! # Coverage
//!
//! | Test | Area |
//! |------|------|
//! | `register_activates_issued_key` | registration |
//! | `register_request_is_anonymous_even_with_credential` | auth header policy |
//! | `send_message_wire_format` | messaging request shape |
//! | `bearer_operations_omit_header_without_credential` | auth header policy |
//! | `directory_operations_never_send_credential` | auth header policy |
//! | `every_request_is_json` | content type |
//! | `unknown_agent_reports_service_detail` | error mapping |
//! | `unknown_recipient_reports_service_detail` | error mapping |
//! | `update_status_then_filter_list` | status + list |
//! | `list_preserves_order_and_pagination` | list |
//! | `update_other_agents_status_is_forbidden` | authorization |
//! | `invalid_key_is_rejected_then_recovered` | credential holder |
//! | `webhook_delivery_is_signed_and_verifiable` | webhook flow |
//! | `webhook_with_wrong_secret_is_rejected` | webhook flow |
//! | `message_status_visible_only_to_participants` | messaging |
//! | `concurrent_sends_share_one_credential` | concurrency |
//! | `file_store_survives_client_restart` | credential persistence |
//! | `verify_known_signature` | webhook verifier |

use std::sync::Arc;
use std::time::Duration;

use agentconnect::{compute_signature, verify_webhook_signature};
use agentconnect_client::{
    api::ListQuery, AgentConnectClient, ClientError, FileCredentialStore, MemoryCredentialStore,
};
use agentconnect_conformance::{spawn_stub_service, spawn_webhook_receiver, StubService};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client(stub: &StubService) -> AgentConnectClient {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    AgentConnectClient::with_http_client(
        http,
        stub.api_base.clone(),
        Arc::new(MemoryCredentialStore::new()),
    )
}

/// Poll a message until it leaves `queued` or the deadline passes.
async fn wait_for_delivery(client: &AgentConnectClient, message_id: &str) -> String {
    for _ in 0..100 {
        let receipt = client.get_message_status(message_id).await.unwrap();
        if receipt.status != "queued" {
            return receipt.status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("message {message_id} still queued");
}

// ---------------------------------------------------------------------------
// Registration and auth header policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_activates_issued_key() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);

    let reg = client.register("Bot", "d", "https://x/hook").await.unwrap();
    assert_eq!(reg.agent_id, "a1");
    assert_eq!(reg.api_key, "k1");
    assert_eq!(reg.secret_token, "s1");
    assert!(client.has_credential());

    let req = stub.last_request().unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/api/agents/register");
    assert_eq!(
        req.body.unwrap(),
        json!({"name": "Bot", "description": "d", "webhook_url": "https://x/hook"})
    );

    // The key is now used for bearer operations.
    client.update_status("a1", "online").await.unwrap();
    let req = stub.last_request().unwrap();
    assert_eq!(req.header("Authorization"), Some("Bearer k1"));
}

#[tokio::test]
async fn register_request_is_anonymous_even_with_credential() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("First", "", "http://localhost/a").await.unwrap();
    client.register("Second", "", "http://localhost/b").await.unwrap();

    let req = stub.last_request().unwrap();
    assert_eq!(req.header("authorization"), None);
    // The newest registration replaces the held key.
    client.update_status("a2", "busy").await.unwrap();
    assert_eq!(
        stub.last_request().unwrap().header("authorization"),
        Some("Bearer k2")
    );
}

#[tokio::test]
async fn send_message_wire_format() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Sender", "", "http://127.0.0.1:9/s").await.unwrap();
    client.register("Recipient", "", "http://127.0.0.1:9/r").await.unwrap();
    client.set_credential("k1").unwrap();

    let receipt = client
        .send_message("a2", &json!({"text": "hi"}))
        .await
        .unwrap();
    assert_eq!(receipt.message_id, "m1");
    assert_eq!(receipt.status, "queued");

    let req = stub.last_request().unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/api/messages/send");
    assert_eq!(req.header("authorization"), Some("Bearer k1"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(
        req.raw_body,
        r#"{"to_agent_id":"a2","message_content":{"text":"hi"}}"#
    );
}

#[tokio::test]
async fn bearer_operations_omit_header_without_credential() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    assert!(!client.has_credential());

    let err = client.update_status("a1", "online").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(stub.last_request().unwrap().header("authorization"), None);

    let err = client.get_message_status("m1").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(stub.last_request().unwrap().header("authorization"), None);

    let err = client.send_message("a1", &json!({})).await.unwrap_err();
    assert!(matches!(err, ClientError::OperationFailed { status: 401, .. }));
    assert_eq!(stub.last_request().unwrap().header("authorization"), None);
}

#[tokio::test]
async fn directory_operations_never_send_credential() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Bot", "", "https://x/hook").await.unwrap();
    assert!(client.has_credential());

    client.list_agents(&ListQuery::default()).await.unwrap();
    client.get_agent("a1").await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 3);
    for req in &requests {
        assert_eq!(req.header("authorization"), None, "{} {}", req.method, req.path);
    }
}

#[tokio::test]
async fn every_request_is_json() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Bot", "", "http://127.0.0.1:9/h").await.unwrap();
    client.list_agents(&ListQuery::default()).await.unwrap();
    client.get_agent("a1").await.unwrap();
    client.update_status("a1", "online").await.unwrap();
    let receipt = client.send_message("a1", &json!("self")).await.unwrap();
    client.get_message_status(&receipt.message_id).await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 6);
    for req in &requests {
        assert_eq!(
            req.header("content-type"),
            Some("application/json"),
            "{} {}",
            req.method,
            req.path
        );
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_agent_reports_service_detail() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);

    let err = client.get_agent("nope").await.unwrap_err();
    match &err {
        ClientError::OperationFailed { status, message } => {
            assert_eq!(*status, 404);
            assert_eq!(message, "Agent not found");
        }
        other => panic!("expected OperationFailed, got {other:?}"),
    }
    assert_eq!(err.to_string(), "Agent not found");
    assert!(!err.is_transport_failure());
}

#[tokio::test]
async fn unknown_recipient_reports_service_detail() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Bot", "", "https://x/hook").await.unwrap();

    let err = client
        .send_message("missing", &json!({"text": "hi"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Recipient agent not found");
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_status_then_filter_list() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Idle", "", "https://x/1").await.unwrap();
    client.register("Busy", "", "https://x/2").await.unwrap();

    let updated = client.update_status("a2", "online").await.unwrap();
    assert_eq!(updated.agent_id, "a2");
    assert_eq!(updated.status, "online");
    assert_eq!(client.get_agent("a2").await.unwrap().status, "online");

    let online = client
        .list_agents(&ListQuery {
            status: Some("online".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(online.len(), 1);
    assert_eq!(online[0].name, "Busy");
    assert_eq!(stub.last_request().unwrap().query.as_deref(), Some("status=online"));

    // Statuses the client has never heard of pass through untouched.
    client.update_status("a2", "hibernating").await.unwrap();
    assert_eq!(client.get_agent("a2").await.unwrap().status, "hibernating");
}

#[tokio::test]
async fn list_preserves_order_and_pagination() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    for name in ["one", "two", "three", "four"] {
        client.register(name, "", "https://x/hook").await.unwrap();
    }

    let all = client.list_agents(&ListQuery::default()).await.unwrap();
    let names: Vec<&str> = all.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["one", "two", "three", "four"]);
    assert!(all.iter().all(|a| a.status == "offline"));
    assert_eq!(stub.last_request().unwrap().query, None);

    let page = client
        .list_agents_page(&ListQuery {
            status: None,
            skip: Some(1),
            limit: Some(2),
        })
        .await
        .unwrap();
    let names: Vec<&str> = page.agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["two", "three"]);
    assert_eq!(page.total, Some(4));
}

#[tokio::test]
async fn update_other_agents_status_is_forbidden() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Mine", "", "https://x/1").await.unwrap();
    client.register("Theirs", "", "https://x/2").await.unwrap();
    client.set_credential("k1").unwrap();

    let err = client.update_status("a2", "online").await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(client.get_agent("a2").await.unwrap().status, "offline");
}

#[tokio::test]
async fn invalid_key_is_rejected_then_recovered() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Bot", "", "https://x/hook").await.unwrap();

    client.set_credential("bogus").unwrap();
    let err = client.update_status("a1", "online").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Invalid API key");

    client.set_credential("k1").unwrap();
    client.update_status("a1", "online").await.unwrap();

    client.clear_credential().unwrap();
    assert!(!client.has_credential());
    let err = client.update_status("a1", "offline").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

// ---------------------------------------------------------------------------
// Messaging and webhook delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn webhook_delivery_is_signed_and_verifiable() {
    let stub = spawn_stub_service().await;
    let receiver = spawn_webhook_receiver().await;

    let alice = make_client(&stub);
    let bob = make_client(&stub);
    alice.register("Alice", "", "http://127.0.0.1:9/unused").await.unwrap();
    let bob_reg = bob.register("Bob", "", &receiver.url).await.unwrap();
    receiver.set_secret(&bob_reg.secret_token);
    assert_eq!(
        stub.secret_token(&bob_reg.agent_id).as_deref(),
        Some(bob_reg.secret_token.as_str())
    );

    let receipt = alice
        .send_message(&bob_reg.agent_id, &json!({"text": "hello", "n": 1}))
        .await
        .unwrap();

    let event = receiver
        .next_event(Duration::from_secs(5))
        .await
        .expect("delivery");
    assert_eq!(event.message_id, receipt.message_id);
    assert_eq!(event.from_agent_id, "a1");
    assert_eq!(event.to_agent_id, "a2");
    assert_eq!(event.message_content, json!({"text": "hello", "n": 1}));
    assert!(!event.timestamp.is_empty());
    assert_eq!(receiver.rejected_count(), 0);

    assert_eq!(wait_for_delivery(&alice, &receipt.message_id).await, "delivered");
    let full = bob.get_message_status(&receipt.message_id).await.unwrap();
    assert_eq!(full.from_agent_id.as_deref(), Some("a1"));
    assert_eq!(full.to_agent_id.as_deref(), Some("a2"));
    assert!(full.delivered_at.is_some());
    assert_eq!(full.error_message, None);
}

#[tokio::test]
async fn webhook_with_wrong_secret_is_rejected() {
    let stub = spawn_stub_service().await;
    let receiver = spawn_webhook_receiver().await;

    let client = make_client(&stub);
    client.register("Bob", "", &receiver.url).await.unwrap();
    receiver.set_secret("not-the-issued-secret");

    let receipt = client.send_message("a1", &json!({"text": "hi"})).await.unwrap();
    assert_eq!(wait_for_delivery(&client, &receipt.message_id).await, "failed");
    assert_eq!(receiver.rejected_count(), 1);
    assert!(receiver.next_event(Duration::from_millis(100)).await.is_none());

    let full = client.get_message_status(&receipt.message_id).await.unwrap();
    assert_eq!(full.error_message.as_deref(), Some("Webhook returned 401"));
}

#[tokio::test]
async fn message_status_visible_only_to_participants() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("A", "", "http://127.0.0.1:9/a").await.unwrap();
    client.register("B", "", "http://127.0.0.1:9/b").await.unwrap();
    client.register("C", "", "http://127.0.0.1:9/c").await.unwrap();

    client.set_credential("k1").unwrap();
    let receipt = client.send_message("a2", &json!({"x": 1})).await.unwrap();

    client.set_credential("k2").unwrap();
    client.get_message_status(&receipt.message_id).await.unwrap();

    client.set_credential("k3").unwrap();
    let err = client.get_message_status(&receipt.message_id).await.unwrap_err();
    assert_eq!(err.status(), Some(403));

    let err = client.get_message_status("m999").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Message not found");
}

#[tokio::test]
async fn concurrent_sends_share_one_credential() {
    let stub = spawn_stub_service().await;
    let client = make_client(&stub);
    client.register("Sender", "", "http://127.0.0.1:9/s").await.unwrap();

    let sends = (0..16).map(|i| {
        let client = client.clone();
        tokio::spawn(async move { client.send_message("a1", &json!({ "i": i })).await })
    });
    let mut ids = Vec::new();
    for handle in sends {
        ids.push(handle.await.unwrap().unwrap().message_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);

    let sends: Vec<_> = stub
        .requests()
        .into_iter()
        .filter(|r| r.path == "/api/messages/send")
        .collect();
    assert_eq!(sends.len(), 16);
    assert!(sends
        .iter()
        .all(|r| r.header("authorization") == Some("Bearer k1")));
}

// ---------------------------------------------------------------------------
// Credential persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_store_survives_client_restart() {
    let stub = spawn_stub_service().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    {
        let store = Arc::new(FileCredentialStore::open(&path).unwrap());
        let client = AgentConnectClient::new(stub.api_base.clone(), store);
        client.register("Bot", "", "https://x/hook").await.unwrap();
    }

    let store = Arc::new(FileCredentialStore::open(&path).unwrap());
    let client = AgentConnectClient::new(stub.api_base.clone(), store);
    assert!(client.has_credential());
    client.update_status("a1", "online").await.unwrap();
    assert_eq!(
        stub.last_request().unwrap().header("authorization"),
        Some("Bearer k1")
    );

    client.clear_credential().unwrap();
    let reopened = FileCredentialStore::open(&path).unwrap();
    let client = AgentConnectClient::new(stub.api_base.clone(), Arc::new(reopened));
    assert!(!client.has_credential());
}

// ---------------------------------------------------------------------------
// Webhook verifier
// ---------------------------------------------------------------------------

#[test]
fn verify_known_signature() {
    let sig = format!("sha256={}", compute_signature(b"{}", b"sec"));
    assert!(verify_webhook_signature("{}", &sig, "sec"));
    assert!(!verify_webhook_signature("{}", &sig, "wrong"));
}
