//! Persistence for the session snapshot
//!
//! Storage is synchronous and local: the client calls it while swapping
//! `AuthState`, never across a network round trip. `FileStorage` writes a
//! single JSON document with atomic temp-file + rename so a crash cannot
//! leave a torn session on disk; `MemoryStorage` keeps nothing beyond the
//! process lifetime.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::auth_info::AuthInfo;
use crate::error::{Error, Result};

/// Where `AuthState` persists the current session.
pub trait Storage: Send + Sync {
    /// Read the stored session, if any.
    fn load(&self) -> Result<Option<AuthInfo>>;

    /// Replace the stored session.
    fn save(&self, info: &AuthInfo) -> Result<()>;

    /// Remove the stored session. Clearing empty storage succeeds.
    fn clear(&self) -> Result<()>;
}

/// In-process storage; sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<Option<AuthInfo>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<AuthInfo>> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, info: &AuthInfo) -> Result<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(info.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file storage.
///
/// The file is created with 0600 permissions on unix since it holds the
/// refresh token.
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

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<AuthInfo>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored session");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(format!("reading session file: {e}"))),
        };
        let info: AuthInfo = serde_json::from_str(&contents)
            .map_err(|e| Error::Serialization(format!("parsing session file: {e}")))?;
        debug!(path = %self.path.display(), user_id = %info.user_id, "loaded stored session");
        Ok(Some(info))
    }

    fn save(&self, info: &AuthInfo) -> Result<()> {
        write_atomic(&self.path, info)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed stored session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing session file: {e}"))),
        }
    }
}

/// Write the session to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target.
fn write_atomic(path: &Path, info: &AuthInfo) -> Result<()> {
    let json = serde_json::to_string_pretty(info)
        .map_err(|e| Error::Serialization(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Storage("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    let mut file = create_private(&tmp_path)
        .map_err(|e| Error::Io(format!("creating temp session file: {e}")))?;
    file.write_all(json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;
    drop(file);

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}

/// Create a fresh file readable only by the owner.
///
/// The mode is set at creation, so the tokens are never on disk with wider
/// permissions. A leftover file from an interrupted write is replaced rather
/// than reused, since its mode may be anything.
fn create_private(path: &Path) -> std::io::Result<File> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
