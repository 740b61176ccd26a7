//! Credential storage for the agent's API key.
//!
//! The client holds at most one bearer credential at a time. Where it lives
//! is up to the host: [`MemoryCredentialStore`] keeps it for the lifetime of
//! the process, [`FileCredentialStore`] persists it across restarts in a
//! small JSON key-value file under the well-known key [`CREDENTIAL_KEY`].
//!
//! Reads are cheap and infallible (stores cache the current value in
//! memory); only writes can fail.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};
use thiserror::Error;

/// Storage key the API key is persisted under.
pub const CREDENTIAL_KEY: &str = "agent_api_key";

/// Errors a credential store can return.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("credential file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Holder for the single active credential.
///
/// Implementations must be `Send + Sync` so one store can be shared by every
/// clone of the client. There is no ordering guarantee between a write here
/// and a request already being built on another task.
pub trait CredentialStore: Send + Sync {
    /// The current credential, if one is held.
    fn get(&self) -> Option<String>;

    /// Activate and persist `token`, replacing any previous credential.
    fn set(&self, token: &str) -> Result<(), CredentialError>;

    /// Deactivate the credential and remove it from persistent storage.
    /// Clearing an empty store is a no-op.
    fn clear(&self) -> Result<(), CredentialError>;
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// Process-lifetime credential store. Nothing is written to disk.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// Credential store backed by a JSON object on disk.
///
/// The file is a flat string map; only [`CREDENTIAL_KEY`] is touched and any
/// other keys are preserved. Writes go to a sibling temp file that is then
/// renamed over the original, and on Unix the file is created with mode
/// `0600`.
///
/// ```json
/// { "agent_api_key": "ak_…" }
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading any persisted credential.
    ///
    /// A missing file is an empty store; it is created on the first
    /// [`set`](CredentialStore::set).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let token = read_map(&path)?
            .get(CREDENTIAL_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        if token.is_some() {
            tracing::debug!("credentials: loaded API key from {}", path.display());
        }
        Ok(Self {
            path,
            cached: RwLock::new(token),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        let mut map = read_map(&self.path)?;
        map.insert(CREDENTIAL_KEY.to_string(), Value::String(token.to_string()));
        write_map_atomic(&self.path, &map)?;
        *cached = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        let mut map = read_map(&self.path)?;
        if map.remove(CREDENTIAL_KEY).is_some() {
            write_map_atomic(&self.path, &map)?;
        }
        *cached = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OverrideCredentialStore
// ---------------------------------------------------------------------------

/// A store whose reads are shadowed by a key that is never persisted.
///
/// Used for `AGENTCONNECT_API_KEY`: the override is active until the first
/// explicit [`set`](CredentialStore::set) or [`clear`](CredentialStore::clear),
/// both of which go to the inner store and drop the override.
pub struct OverrideCredentialStore {
    inner: Arc<dyn CredentialStore>,
    override_token: RwLock<Option<String>>,
}

impl OverrideCredentialStore {
    pub fn new(inner: Arc<dyn CredentialStore>, token: impl Into<String>) -> Self {
        Self {
            inner,
            override_token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for OverrideCredentialStore {
    fn get(&self) -> Option<String> {
        self.override_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .or_else(|| self.inner.get())
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        let mut override_token = self
            .override_token
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.set(token)?;
        *override_token = None;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut override_token = self
            .override_token
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.clear()?;
        *override_token = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CredentialError + '_ {
    move |source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_map(path: &Path) -> Result<Map<String, Value>, CredentialError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(io_error(path)(e)),
    };
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CredentialError::Corrupt {
            path: path.to_path_buf(),
            reason: "expected a JSON object".into(),
        }),
        Err(e) => Err(CredentialError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn write_map_atomic(path: &Path, map: &Map<String, Value>) -> Result<(), CredentialError> {
    let content = serde_json::to_string_pretty(map).map_err(|e| CredentialError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let temp_path = temp_sibling(path);
    let mut file = create_private(&temp_path).map_err(io_error(&temp_path))?;
    file.write_all(content.as_bytes())
        .map_err(io_error(&temp_path))?;
    file.sync_all().map_err(io_error(&temp_path))?;
    fs::rename(&temp_path, path).map_err(io_error(path))?;
    Ok(())
}

/// `<file name>.<pid>.tmp` next to `path`; never equal to `path` itself.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<File> {
    File::create(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
