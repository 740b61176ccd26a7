//! Test tooling for the AgentConnect client SDK.
//!
//! Provides two in-process servers, each bound to an ephemeral port on
//! `127.0.0.1` and driven by a background `tokio` task:
//!
//! - [`spawn_stub_service`]: a stub of the registry and messaging service.
//!   It implements every endpoint the client calls, issues deterministic
//!   ids (`a1`, `k1`, `s1`, `m1`, …), records each request's method, path,
//!   headers and body for wire-level assertions, and delivers sent messages
//!   to the recipient's webhook with a real HMAC signature.
//! - [`spawn_webhook_receiver`]: an agent-side webhook endpoint that
//!   verifies each delivery before accepting it.
//!
//! The stub is not a reference server. It exists so the end-to-end suite in
//! `tests/conformance.rs` can run the real client over real HTTP.

pub mod receiver;
pub mod stub;

pub use receiver::{spawn_webhook_receiver, WebhookReceiver};
pub use stub::{spawn_stub_service, RecordedRequest, StubService};
