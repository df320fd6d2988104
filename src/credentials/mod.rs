//! Credential store for the request headers replayed against the history
//! API.
//!
//! Every `put` appends a new entry; `get` returns the most recent one.
//! The file-backed store encrypts each entry with [`cipher::HeaderCipher`].

pub mod cipher;
pub mod curl;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{GatewayError, HeaderBlob};
use cipher::HeaderCipher;

/// Keeps the latest header blob for later reuse.
pub trait CredentialStore: Send + Sync {
    /// Store a new header blob. It becomes the one `get` returns.
    fn put(&self, headers: &HeaderBlob) -> Result<(), GatewayError>;

    /// The most recently stored blob, or `GatewayError::NotFound`.
    fn get(&self) -> Result<HeaderBlob, GatewayError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store (tests, one-shot CLI runs).
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<Vec<HeaderBlob>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn put(&self, headers: &HeaderBlob) -> Result<(), GatewayError> {
        self.entries
            .lock()
            .map_err(|_| GatewayError::Storage("credential store lock poisoned".into()))?
            .push(headers.clone());
        Ok(())
    }

    fn get(&self) -> Result<HeaderBlob, GatewayError> {
        self.entries
            .lock()
            .map_err(|_| GatewayError::Storage("credential store lock poisoned".into()))?
            .last()
            .cloned()
            .ok_or_else(|| GatewayError::NotFound("no stored headers".into()))
    }
}

// ---------------------------------------------------------------------------
// Encrypted file store
// ---------------------------------------------------------------------------

/// One persisted entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredHeaders {
    id: Uuid,
    created_at: DateTime<Utc>,
    /// Encrypted JSON of the header map.
    ciphertext: String,
}

/// Entries kept in the credential file; older ones are dropped on `put`.
pub const MAX_STORED_ENTRIES: usize = 20;

/// JSON file of encrypted header entries.
pub struct FileCredentialStore {
    path: PathBuf,
    cipher: HeaderCipher,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, cipher: HeaderCipher) -> Self {
        Self {
            path: path.into(),
            cipher,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Vec<StoredHeaders>, GatewayError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            GatewayError::Storage(format!("failed to read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            GatewayError::Storage(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    fn write_entries(&self, entries: &[StoredHeaders]) -> Result<(), GatewayError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| GatewayError::Storage(format!("failed to create {}: {e}", dir.display())))?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| GatewayError::Storage(format!("failed to serialise headers: {e}")))?;
        std::fs::write(&self.path, json).map_err(|e| {
            GatewayError::Storage(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn put(&self, headers: &HeaderBlob) -> Result<(), GatewayError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| GatewayError::Storage("credential store lock poisoned".into()))?;

        let plaintext = serde_json::to_string(headers)
            .map_err(|e| GatewayError::Storage(format!("failed to serialise headers: {e}")))?;
        let mut entries = self.read_entries()?;
        entries.push(StoredHeaders {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ciphertext: self.cipher.encrypt(&plaintext)?,
        });
        if entries.len() > MAX_STORED_ENTRIES {
            entries.sort_by_key(|e| e.created_at);
            let excess = entries.len() - MAX_STORED_ENTRIES;
            entries.drain(..excess);
            debug!(pruned = excess, "Dropped old header entries");
        }
        self.write_entries(&entries)?;

        info!(
            path = %self.path.display(),
            header_count = headers.len(),
            entries = entries.len(),
            "Headers encrypted and stored"
        );
        Ok(())
    }

    fn get(&self) -> Result<HeaderBlob, GatewayError> {
        let entries = self.read_entries()?;
        // Latest wins; ties resolve to the later entry in the file.
        let latest = entries
            .iter()
            .enumerate()
            .max_by_key(|(i, e)| (e.created_at, *i))
            .map(|(_, e)| e)
            .ok_or_else(|| GatewayError::NotFound("no stored headers".into()))?;

        let plaintext = self.cipher.decrypt(&latest.ciphertext)?;
        let headers: HeaderBlob = serde_json::from_str(&plaintext)
            .map_err(|e| GatewayError::Storage(format!("stored headers are not a JSON map: {e}")))?;

        debug!(id = %latest.id, header_count = headers.len(), "Loaded stored headers");
        Ok(headers)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
