//! Client configuration, populated from environment variables.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::credentials::{
    CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore,
    OverrideCredentialStore,
};

/// API base used when `AGENTCONNECT_API_BASE` is not set.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Runtime configuration for an [`AgentConnectClient`](crate::AgentConnectClient).
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `AGENTCONNECT_API_BASE` | `http://localhost:8000/api` | Service API base, including `/api` |
/// | `AGENTCONNECT_CREDENTIALS` | `$HOME/.agentconnect/credentials.json` | Credential file; no `HOME` means in-memory only |
/// | `AGENTCONNECT_API_KEY` | (absent) | API key used for this process instead of the stored one; never written to the credential file |
#[derive(Clone)]
pub struct ClientConfig {
    /// Service API base URL, e.g. `"https://connect.example.com/api"`.
    pub api_base: String,

    /// Path of the persistent credential file.
    /// `None` means the credential lives in memory only.
    pub credentials_path: Option<PathBuf>,

    /// API key that shadows the stored one for this process.
    pub api_key: Option<String>,
}

impl ClientConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        let credentials_path = std::env::var_os("AGENTCONNECT_CREDENTIALS")
            .map(PathBuf::from)
            .or_else(default_credentials_path);

        Self {
            api_base: std::env::var("AGENTCONNECT_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.into()),
            credentials_path,
            api_key: std::env::var("AGENTCONNECT_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        }
    }

    /// Open the credential store this config describes. When `api_key` is
    /// set it shadows the stored key for this process only; nothing is
    /// written until an explicit `set` or `clear`.
    pub fn open_credential_store(&self) -> Result<Arc<dyn CredentialStore>, CredentialError> {
        let store: Arc<dyn CredentialStore> = match &self.credentials_path {
            Some(path) => Arc::new(FileCredentialStore::open(path)?),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Ok(match &self.api_key {
            Some(key) => Arc::new(OverrideCredentialStore::new(store, key.clone())),
            None => store,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            credentials_path: None,
            api_key: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base", &self.api_base)
            .field("credentials_path", &self.credentials_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_credentials_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(".agentconnect").join("credentials.json"))
}
