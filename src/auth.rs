//! Where the bearer token for milestone submission comes from.
//!
//! The quiz flow only ever reads a token through [`TokenProvider`]. The
//! persisted [`FileAuthStore`] keeps one auth blob per key in a JSON file;
//! the bot writes into it from `/login` and `/logout`.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StoreError;

pub trait TokenProvider: Send + Sync {
    /// `None` when nobody is signed in. Blank tokens count as absent.
    fn bearer_token(&self) -> Option<String>;
}

/// Persisted auth payload: the token plus whatever the login response carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthBlob {
    pub token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthBlob {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug)]
pub struct FileAuthStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl FileAuthStore {
    pub fn open(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn load(&self, key: &str) -> Result<Option<AuthBlob>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn save(&self, key: &str, blob: AuthBlob) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), blob);
        self.write_all(&entries)?;
        debug!("Stored auth blob under '{key}'");
        Ok(())
    }

    /// Returns whether an entry was removed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        let removed = entries.remove(key).is_some();
        if removed {
            self.write_all(&entries)?;
        }
        Ok(removed)
    }

    /// A read-only token view onto one key of this store.
    pub fn scoped(self: &Arc<Self>, key: impl Into<String>) -> StoredToken {
        StoredToken {
            store: Arc::clone(self),
            key: key.into(),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, AuthBlob>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupted {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, AuthBlob>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|source| {
            StoreError::Corrupted {
                path: self.path.clone(),
                source,
            }
        })?;

        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoredToken {
    store: Arc<FileAuthStore>,
    key: String,
}

impl TokenProvider for StoredToken {
    fn bearer_token(&self) -> Option<String> {
        match self.store.load(&self.key) {
            Ok(blob) => blob.map(|b| b.token).filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read token '{}': {e}", self.key);
                None
            }
        }
    }
}
