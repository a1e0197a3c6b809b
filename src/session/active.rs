//! Active-session info file.
//!
//! When a session is created, its name and UUID are written to a
//! well-known file so that other tools (and the next client run) can find
//! the session that is currently serving this environment. The file is
//! truncated, not deleted, when the session stops.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// On-disk record of the currently active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessionRecord {
    /// Fully-qualified session resource name.
    pub session_name: String,
    /// Server-assigned session UUID.
    pub session_uuid: String,
}

impl ActiveSessionRecord {
    pub fn new(session_name: impl Into<String>, session_uuid: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            session_uuid: session_uuid.into(),
        }
    }

    /// Write this record to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read the record from `path`.
    ///
    /// Returns `None` when the file does not exist or has been cleared.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Clear the record at `path` by truncating the file.
    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::write(path, "") {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let record = ActiveSessionRecord::new(
            "projects/p/locations/r/sessions/sc-20250806-120000-abc123",
            "d2b0a9c8-aaaa-bbbb-cccc-000011112222",
        );
        record.write(&path).unwrap();

        let read = ActiveSessionRecord::read(&path).unwrap().unwrap();
        assert_eq!(read, record);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("session.json");

        ActiveSessionRecord::new("name", "uuid").write(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(ActiveSessionRecord::read(&path).unwrap(), None);
    }

    #[test]
    fn test_clear_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        ActiveSessionRecord::new("name", "uuid").write(&path).unwrap();
        ActiveSessionRecord::clear(&path).unwrap();

        assert!(path.exists());
        assert_eq!(ActiveSessionRecord::read(&path).unwrap(), None);
    }

    #[test]
    fn test_clear_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ActiveSessionRecord::clear(&dir.path().join("absent.json")).is_ok());
    }
}
