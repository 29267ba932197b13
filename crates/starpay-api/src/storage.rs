// ── Durable session storage ──
//
// The session store writes one versioned record on every transition and
// reads it back once, at hydration. Backends only move records around;
// they never decide whether a record is valid.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Schema version written alongside every persisted session.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted session is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The on-disk shape of a session.
///
/// `is_authenticated` is written for compatibility with older readers;
/// on load the token alone decides whether the session is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    pub version: u32,
}

/// A place the session record survives process restarts.
pub trait SessionStorage: Send + Sync {
    /// Read the persisted record. `Ok(None)` means nothing was ever saved.
    fn load(&self) -> Result<Option<PersistedSession>, SessionError>;

    /// Replace the persisted record.
    fn save(&self, record: &PersistedSession) -> Result<(), SessionError>;
}

// ── File backend ─────────────────────────────────────────────────────

/// Stores the session as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        trace!(path = %self.path.display(), "read persisted session");
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, record: &PersistedSession) -> Result<(), SessionError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_vec_pretty(record)?;

        // Temp files are owner-only (0600 on unix); the rename replaces the
        // old record in one step, so a crash never leaves a partial file.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        trace!(path = %self.path.display(), "wrote persisted session");
        Ok(())
    }
}

// ── In-memory backend ────────────────────────────────────────────────

/// Keeps the record in process memory. Used by tests and by callers that
/// want a session that dies with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    record: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-persisted record, as if written by a prior run.
    pub fn with_record(record: PersistedSession) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    /// The last record saved, if any.
    pub fn record(&self) -> Option<PersistedSession> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        Ok(self.record())
    }

    fn save(&self, record: &PersistedSession) -> Result<(), SessionError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }
}
