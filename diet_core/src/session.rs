//! Active-user session state.
//!
//! The currently active user's id is small persistent state kept outside
//! the main database file. Loading is forgiving (a missing or corrupt
//! session file just means nobody is active); saving is atomic.

use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Per-installation session state
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionState {
    pub active_user_id: Option<Uuid>,
}

impl SessionState {
    /// Load session state with shared locking
    ///
    /// Returns default state if the file doesn't exist or can't be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No session file found, no active user");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open session file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock session file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read session file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<SessionState>(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse session file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save session state atomically (temp file, sync, rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "session path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved session state to {:?}", path);
        Ok(())
    }

    /// Load, modify, and save in one step
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut SessionState) -> Result<()>,
    {
        let mut state = Self::load(path)?;
        f(&mut state)?;
        state.save(path)?;
        Ok(state)
    }

    /// Remove the session file entirely (full data reset)
    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Cleared session state at {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");

        let state = SessionState {
            active_user_id: Some(Uuid::new_v4()),
        };
        state.save(&path).unwrap();

        let loaded = SessionState::load(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        let state = SessionState::load(&path).unwrap();
        assert_eq!(state.active_user_id, None);
    }

    #[test]
    fn test_corrupt_session_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let state = SessionState::load(&path).unwrap();
        assert_eq!(state.active_user_id, None);
    }

    #[test]
    fn test_update_pattern() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        let id = Uuid::new_v4();

        SessionState::update(&path, |state| {
            state.active_user_id = Some(id);
            Ok(())
        })
        .unwrap();

        let loaded = SessionState::load(&path).unwrap();
        assert_eq!(loaded.active_user_id, Some(id));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("session.json");

        SessionState::default().save(&path).unwrap();
        SessionState::clear(&path).unwrap();
        assert!(!path.exists());

        // Clearing again is fine
        SessionState::clear(&path).unwrap();
    }
}
