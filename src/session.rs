//! Session handling
//!
//! The bearer token lives in an explicit [`SessionContext`] handed to the
//! API client at construction. [`SessionStore`] persists it between runs
//! together with the one-time tutorial flag, and [`SessionGuard`] decides
//! whether a dashboard command may run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::DashboardResult;

/// Storage key of the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key of the tutorial flag
pub const TUTORIAL_KEY: &str = "tutorial_shown";

/// In-memory session injected into the API client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    token: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()).filter(|t: &String| !t.is_empty()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn set_token(&mut self, token: String) {
        self.token = Some(token).filter(|t| !t.is_empty());
    }

    /// Drop the token; subsequent requests go out unauthenticated
    pub fn clear(&mut self) {
        self.token = None;
    }
}

/// Outcome of the session guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    RedirectToLogin,
}

/// Gate in front of every dashboard view
pub struct SessionGuard;

impl SessionGuard {
    pub fn check(session: &SessionContext) -> Access {
        if session.is_authenticated() {
            Access::Granted
        } else {
            Access::RedirectToLogin
        }
    }
}

/// On-disk session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub tutorial_shown: bool,
}

/// TOML file holding the token and tutorial flag
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored state; a missing or unreadable file is an empty session
    pub fn load(&self) -> StoredSession {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return StoredSession::default(),
        };

        match toml::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Ignoring unreadable session file");
                StoredSession::default()
            }
        }
    }

    /// Session context for the API client
    pub fn context(&self) -> SessionContext {
        match self.load().token {
            Some(token) => SessionContext::with_token(token),
            None => SessionContext::anonymous(),
        }
    }

    pub fn save(&self, stored: &StoredSession) -> DashboardResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string(stored)
            .map_err(|e| crate::error::DashboardError::Decode(e.to_string()))?;
        write_private(&self.path, content.as_bytes())?;
        Ok(())
    }

    pub fn store_token(&self, token: &str) -> DashboardResult<()> {
        let mut stored = self.load();
        stored.token = Some(token.to_string());
        self.save(&stored)
    }

    /// Logout teardown; the tutorial flag survives
    pub fn clear_token(&self) -> DashboardResult<()> {
        let mut stored = self.load();
        if stored.token.take().is_none() && !self.path.exists() {
            return Ok(());
        }
        self.save(&stored)
    }

    /// Returns true exactly once per store, marking the tutorial as shown
    pub fn take_tutorial(&self) -> DashboardResult<bool> {
        let mut stored = self.load();
        if stored.tutorial_shown {
            return Ok(false);
        }
        stored.tutorial_shown = true;
        self.save(&stored)?;
        Ok(true)
    }
}

/// Write a file only its owner can read; it holds the bearer token
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = SessionStore::new(&path);
        store.store_token("secret").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.context().token(), Some("secret"));
    }

    #[test]
    fn test_guard_redirects_without_token() {
        assert_eq!(
            SessionGuard::check(&SessionContext::anonymous()),
            Access::RedirectToLogin
        );
        assert_eq!(
            SessionGuard::check(&SessionContext::with_token("abc")),
            Access::Granted
        );
        assert_eq!(
            SessionGuard::check(&SessionContext::with_token("")),
            Access::RedirectToLogin
        );
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.toml"));

        assert_eq!(store.load(), StoredSession::default());

        store.store_token("secret").unwrap();
        assert_eq!(store.context().token(), Some("secret"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(TOKEN_KEY));
    }

    #[test]
    fn test_logout_keeps_tutorial_flag() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));

        store.store_token("secret").unwrap();
        assert!(store.take_tutorial().unwrap());
        store.clear_token().unwrap();

        let stored = store.load();
        assert_eq!(stored.token, None);
        assert!(stored.tutorial_shown);
        assert!(!store.context().is_authenticated());
    }

    #[test]
    fn test_tutorial_shown_once() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));

        assert!(store.take_tutorial().unwrap());
        assert!(!store.take_tutorial().unwrap());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(TUTORIAL_KEY));
    }

    #[test]
    fn test_corrupt_file_is_empty_session() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "token = [").unwrap();

        let store = SessionStore::new(path);
        assert_eq!(store.load(), StoredSession::default());
    }

    #[test]
    fn test_clear_context() {
        let mut session = SessionContext::with_token("abc");
        session.clear();
        assert_eq!(session.token(), None);
    }
}
