// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-disk persistence of the signed-in session.

use crate::models::Session;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// JSON file holding the current session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the stored session, if any.
    ///
    /// An unreadable file is treated as signed out rather than an error.
    pub fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionStoreError::Io(e.to_string())),
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding corrupt session file");
                Ok(None)
            }
        }
    }

    /// Persist `session`, replacing any previous one.
    ///
    /// The file is written owner-only to a sibling path and renamed into
    /// place, so readers see either the old session or the new one.
    pub fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionStoreError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| SessionStoreError::Encode(e.to_string()))?;

        let tmp = self.temp_path();
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let written = options.open(&tmp).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(SessionStoreError::Io(e.to_string()));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Remove the stored session. Missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::Io(e.to_string())),
        }
    }
}

/// Errors from session persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session file I/O failed: {0}")]
    Io(String),

    #[error("Failed to encode session: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use chrono::Utc;
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: Utc::now(),
            user: User {
                id: Uuid::new_v4(),
                email: Some("me@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().unwrap().is_none());

        let saved = session();
        store.save(&saved).unwrap();
        let loaded = store.load().unwrap().expect("session stored");
        assert_eq!(loaded.user, saved.user);
        assert_eq!(loaded.access_token, "at");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_overwrite_is_owner_only_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(&path);

        store.save(&session()).unwrap();
        let mut second = session();
        second.access_token = "at2".to_string();
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap().unwrap().access_token, "at2");
        assert!(!dir.path().join("session.json.tmp").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_corrupt_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(SessionStore::new(path).load().unwrap().is_none());
    }
}
