use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::User;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Token expiry time in days.
/// The server signs tokens with a 7 day lifetime.
const TOKEN_EXPIRY_DAYS: i64 = 7;

/// The client-side auth store consumed by the request pipeline.
///
/// Implementations must apply `set_auth` and `logout` atomically: a reader
/// never observes a user without a token or the reverse.
pub trait SessionStore: Send + Sync {
    /// Current bearer token, if logged in
    fn token(&self) -> Option<String>;

    /// Whether the local clock already knows the token is dead
    fn is_token_expired(&self) -> bool;

    fn set_auth(&self, user: User, token: String);

    fn logout(&self);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: User,
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user: User, token: String) -> Self {
        Self {
            user,
            token,
            issued_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::days(TOKEN_EXPIRY_DAYS)
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at() - Utc::now()
    }
}

/// Shared session, optionally persisted as JSON in a cache directory.
///
/// `None` data means logged out, so "authenticated iff user and token are
/// both set" holds by construction.
pub struct Session {
    cache_dir: Option<PathBuf>,
    data: RwLock<Option<SessionData>>,
}

impl Session {
    /// Session that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            cache_dir: None,
            data: RwLock::new(None),
        }
    }

    /// Session persisted under `cache_dir`; call `load` to restore it.
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir: Some(cache_dir),
            data: RwLock::new(None),
        }
    }

    /// Load session from disk. Returns whether a session was restored.
    pub fn load(&self) -> Result<bool> {
        let Some(path) = self.session_path() else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        debug!(user = %data.user.display_name(), expired = data.is_expired(), "Session loaded");
        *self.write() = Some(data);
        Ok(true)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.session_path() else {
            return Ok(());
        };
        let data = self.data();
        match data {
            Some(ref data) => write_session_file(&path, data),
            None => {
                if path.exists() {
                    std::fs::remove_file(&path).context("Failed to remove session file")?;
                }
                Ok(())
            }
        }
    }

    /// Snapshot of the current session
    pub fn data(&self) -> Option<SessionData> {
        self.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|d| d.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Authenticated and not locally known to be expired
    pub fn is_valid(&self) -> bool {
        self.read().as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    fn session_path(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(SESSION_FILE))
    }

    // A poisoned lock only means a writer panicked mid-assignment of an
    // Option, which cannot leave it torn.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<SessionData>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<SessionData>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save session");
        }
    }
}

impl SessionStore for Session {
    fn token(&self) -> Option<String> {
        self.read().as_ref().map(|d| d.token.clone())
    }

    fn is_token_expired(&self) -> bool {
        self.read().as_ref().map(|d| d.is_expired()).unwrap_or(true)
    }

    fn set_auth(&self, user: User, token: String) {
        debug!(user = %user.display_name(), "Session updated");
        *self.write() = Some(SessionData::new(user, token));
        self.persist();
    }

    fn logout(&self) {
        debug!("Session cleared");
        *self.write() = None;
        self.persist();
    }
}

fn write_session_file(path: &Path, data: &SessionData) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create session directory")?;
    }
    let contents = serde_json::to_string_pretty(data)?;
    std::fs::write(path, contents).context("Failed to write session file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.org", id),
            created_at: None,
        }
    }

    #[test]
    fn test_new_session_is_logged_out() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
        assert!(session.user().is_none());
        assert!(session.is_token_expired());
    }

    #[test]
    fn test_set_auth_and_logout() {
        let session = Session::in_memory();
        session.set_auth(user("u1"), "T1".to_string());
        assert!(session.is_authenticated());
        assert!(session.is_valid());
        assert_eq!(session.token().as_deref(), Some("T1"));
        assert_eq!(session.user().map(|u| u.id), Some("u1".to_string()));
        assert!(!session.is_token_expired());

        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
        assert!(session.user().is_none());
    }

    #[test]
    fn test_session_data_expiry() {
        let mut data = SessionData::new(user("u1"), "T1".to_string());
        assert!(!data.is_expired());
        assert!(data.time_until_expiry() > Duration::days(6));

        data.issued_at = Utc::now() - Duration::days(TOKEN_EXPIRY_DAYS) - Duration::minutes(1);
        assert!(data.is_expired());
    }

    #[test]
    fn test_persisted_session_round_trip() {
        let tmp = tempfile::tempdir().unwrap();

        let session = Session::new(tmp.path().to_path_buf());
        session.set_auth(user("u1"), "T1".to_string());
        assert!(tmp.path().join(SESSION_FILE).exists());

        let restored = Session::new(tmp.path().to_path_buf());
        assert!(restored.load().unwrap());
        assert_eq!(restored.data(), session.data());

        restored.logout();
        assert!(!tmp.path().join(SESSION_FILE).exists());

        let empty = Session::new(tmp.path().to_path_buf());
        assert!(!empty.load().unwrap());
        assert!(!empty.is_authenticated());
    }

    #[test]
    fn test_expired_session_loads_but_reports_expired() {
        let tmp = tempfile::tempdir().unwrap();
        let mut data = SessionData::new(user("u1"), "T1".to_string());
        data.issued_at = Utc::now() - Duration::days(30);
        write_session_file(&tmp.path().join(SESSION_FILE), &data).unwrap();

        let session = Session::new(tmp.path().to_path_buf());
        assert!(session.load().unwrap());
        assert!(session.is_authenticated());
        assert!(!session.is_valid());
        assert!(session.is_token_expired());
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(SESSION_FILE), "{not json").unwrap();

        let session = Session::new(tmp.path().to_path_buf());
        assert!(session.load().is_err());
        assert!(!session.is_authenticated());
    }
}
