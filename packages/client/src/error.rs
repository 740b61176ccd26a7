//! Errors returned by [`AgentConnectClient`](crate::AgentConnectClient).

use agentconnect_api::RegisterResponse;
use thiserror::Error;

use crate::credentials::CredentialError;

/// Every way a client operation can fail.
///
/// Transport-level problems ([`Transport`](Self::Transport),
/// [`MalformedBody`](Self::MalformedBody)) are kept apart from a service that
/// answered with a non-success status ([`OperationFailed`](Self::OperationFailed)).
/// Use [`is_transport_failure`](Self::is_transport_failure) to branch on the
/// distinction.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received (connection refused, DNS, TLS, reset…).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body could not be decoded.
    #[error("transport failure: malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// The service answered with a non-success status. `message` is the
    /// service's `detail` text, or a generic fallback; it displays verbatim.
    #[error("{message}")]
    OperationFailed { status: u16, message: String },

    /// The request was rejected locally before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reading or writing the local credential failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Registration succeeded on the service but the issued API key could
    /// not be persisted. The registration is carried here so the one-time
    /// secrets are not lost.
    #[error("agent {} registered but its API key could not be stored: {source}", .registration.agent_id)]
    RegistrationNotPersisted {
        registration: Box<RegisterResponse>,
        #[source]
        source: CredentialError,
    },
}

impl ClientError {
    /// `true` for failures where no usable response was received.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::MalformedBody(_))
    }

    /// HTTP status of an [`OperationFailed`](Self::OperationFailed) error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::OperationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}
