//! Session credential storage
//!
//! The store is read synchronously right before each request is dispatched,
//! so whatever is stored at that moment is what the request carries. Nothing
//! here expires tokens; they stay until `clear()` is called.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{ClientError, Result, ValidationError};

/// Durable holder of the bearer token
pub trait TokenStore: Send + Sync {
    /// Stored token, if any
    fn get(&self) -> Option<String>;

    /// Persist `token`, replacing any previous one
    fn set(&self, token: &str) -> Result<()>;

    /// Remove the stored token
    fn clear(&self) -> Result<()>;

    fn has_token(&self) -> bool {
        self.get().is_some()
    }
}

fn check_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(ValidationError::EmptyToken.into());
    }
    Ok(())
}

/// Process-local token store
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    fn set(&self, token: &str) -> Result<()> {
        check_token(token)?;
        let mut slot = self
            .token
            .write()
            .map_err(|_| ClientError::Storage("token lock poisoned".into()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| ClientError::Storage("token lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

/// Token store backed by a JSON file shared by every origin
///
/// File layout: `{ "<origin>": "<token>", ... }`. Each instance only reads
/// and writes the entry for its own origin. The file is re-read on every
/// `get`, so a login from another process is picked up by the next request.
pub struct FileTokenStore {
    path: PathBuf,
    origin: String,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn open(path: impl Into<PathBuf>, origin: impl Into<String>) -> Self {
        let store = Self {
            path: path.into(),
            origin: origin.into(),
            write_lock: Mutex::new(()),
        };
        debug!(path = %store.path.display(), origin = %store.origin, "Token store opened");
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ClientError::Storage(format!("corrupt token file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(ClientError::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_all(&self, tokens: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ClientError::Storage(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let payload = serde_json::to_string_pretty(tokens)
            .map_err(|e| ClientError::Storage(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                ClientError::Storage(format!("failed to write {}: {}", self.path.display(), e))
            })
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ClientError::Storage("token file lock poisoned".into()))?;
        let mut tokens = self.read_all()?;
        f(&mut tokens);
        self.write_all(&tokens)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        match self.read_all() {
            Ok(mut tokens) => tokens.remove(&self.origin),
            Err(e) => {
                warn!(error = %e, "Token store unreadable, treating as logged out");
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<()> {
        check_token(token)?;
        self.update(|tokens| {
            tokens.insert(self.origin.clone(), token.to_string());
        })?;
        debug!(origin = %self.origin, "Token stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.update(|tokens| {
            tokens.remove(&self.origin);
        })?;
        debug!(origin = %self.origin, "Token cleared");
        Ok(())
    }
}
