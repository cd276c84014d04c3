//! Backing storage for a single web session.
//!
//! The token store never talks to storage directly. It goes through a
//! [`SessionBackend`], the per-session key/value map that the surrounding web
//! framework (or the CLI) owns. Backends only have to provide a snapshot read
//! and a locked read-modify-write.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Key/value contents of one session.
pub type SessionData = serde_json::Map<String, serde_json::Value>;

/// Per-session key/value storage.
///
/// `modify` is the atomicity unit: every change the closure makes is
/// persisted as one write, and concurrent `modify` calls against the same
/// backend are serialized.
pub trait SessionBackend: Send + Sync + std::fmt::Debug {
    /// Return a snapshot of the session contents.
    fn read(&self) -> Result<SessionData>;

    /// Apply `f` to the session contents and persist the result.
    fn modify(&self, f: &mut dyn FnMut(&mut SessionData)) -> Result<()>;
}

// ============================================================================
// MemorySession
// ============================================================================

/// In-process session storage.
#[derive(Debug, Default)]
pub struct MemorySession {
    data: Mutex<SessionData>,
}

impl MemorySession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session pre-populated with `data`.
    pub fn with_data(data: SessionData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }
}

impl SessionBackend for MemorySession {
    fn read(&self) -> Result<SessionData> {
        Ok(self.data.lock().clone())
    }

    fn modify(&self, f: &mut dyn FnMut(&mut SessionData)) -> Result<()> {
        let mut data = self.data.lock();
        f(&mut data);
        Ok(())
    }
}

// ============================================================================
// FileSession
// ============================================================================

/// Session storage in a JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a reader never observes a half-written session.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSession {
    /// Create a file-backed session at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionData> {
        if !self.path.exists() {
            return Ok(SessionData::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Storage(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(SessionData::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn store(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), keys = data.len(), "Session saved");
        Ok(())
    }
}

impl SessionBackend for FileSession {
    fn read(&self) -> Result<SessionData> {
        let _guard = self.lock.lock();
        self.load()
    }

    fn modify(&self, f: &mut dyn FnMut(&mut SessionData)) -> Result<()> {
        let _guard = self.lock.lock();
        let mut data = self.load()?;
        f(&mut data);
        self.store(&data)
    }
}
