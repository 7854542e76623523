//! Session store
//!
//! The authentication collaborator: a static credential comparison plus a
//! session flag persisted under a fixed key in the platform data directory.
//! The cache layer itself is not gated on it; front ends are.

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Fixed file name the session flag is persisted under
pub const SESSION_FILE: &str = "session.json";

/// Expected credentials for the static login comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFlag {
    authenticated: bool,
    username: String,
}

/// Persisted session flag with login/logout operations
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Session store backed by a specific file (used by tests)
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Session store under the platform data directory
    pub fn open_default() -> Self {
        let dir = dirs::data_dir()
            .map(|dir| dir.join("catalog"))
            .unwrap_or_else(|| PathBuf::from(".catalog"));
        Self::new(dir.join(SESSION_FILE))
    }

    /// Compare credentials and persist the session flag on a match
    ///
    /// Returns `false` without touching storage when the comparison fails.
    pub fn login(&self, expected: &Credentials, username: &str, password: &str) -> Result<bool> {
        if username != expected.username || password != expected.password {
            debug!("login rejected for user {username}");
            return Ok(false);
        }
        let flag = SessionFlag {
            authenticated: true,
            username: username.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Session(e.to_string()))?;
        }
        let body = serde_json::to_string(&flag).map_err(|e| Error::Session(e.to_string()))?;
        fs::write(&self.path, body).map_err(|e| Error::Session(e.to_string()))?;
        debug!("session persisted for user {username}");
        Ok(true)
    }

    /// Clear the persisted session flag
    pub fn logout(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(Error::Session(error.to_string())),
        }
    }

    /// True when a valid session flag is persisted
    pub fn is_authenticated(&self) -> bool {
        self.read_flag()
            .map(|flag| flag.authenticated)
            .unwrap_or(false)
    }

    /// Username of the persisted session, if any
    pub fn current_user(&self) -> Option<String> {
        self.read_flag()
            .filter(|flag| flag.authenticated)
            .map(|flag| flag.username)
    }

    fn read_flag(&self) -> Option<SessionFlag> {
        let body = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&body).ok()
    }
}
