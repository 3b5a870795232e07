use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::user_models::{Session, User};

pub const TOKEN_FILE: &str = "token";
pub const USER_FILE: &str = "user.json";

pub const SESSION_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredUserRef<'a> {
    version: u32,
    user: &'a User,
}

/// Persists the session as two fixed entries under one directory: the raw
/// token and a versioned user document.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(USER_FILE)
    }

    /// Reads the stored session. Anything missing, unreadable or of the
    /// wrong shape yields `None`.
    pub fn load(&self) -> Option<Session> {
        let token_path = self.token_path();
        let user_path = self.user_path();
        if !token_path.exists() && !user_path.exists() {
            return None;
        }

        let token = match fs::read_to_string(&token_path) {
            Ok(token) => token.trim().to_string(),
            Err(e) => {
                tracing::warn!(path = %token_path.display(), error = %e, "stored token unreadable, starting logged out");
                return None;
            }
        };
        if token.is_empty() {
            tracing::warn!("stored token is empty, starting logged out");
            return None;
        }

        let raw = match fs::read_to_string(&user_path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %user_path.display(), error = %e, "stored user unreadable, starting logged out");
                return None;
            }
        };

        let user = match migrate_user(&raw) {
            Some(user) => user,
            None => {
                tracing::warn!(path = %user_path.display(), "stored user has an unexpected shape, starting logged out");
                return None;
            }
        };

        Some(Session { token, user })
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&StoredUserRef {
            version: SESSION_SCHEMA_VERSION,
            user: &session.user,
        })
        .map_err(std::io::Error::from)?;
        fs::write(self.token_path(), &session.token)?;
        fs::write(self.user_path(), json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        for path in [self.token_path(), self.user_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Decodes the user entry, upgrading older layouts. Version 0 is the bare
/// user object written before the entry was versioned.
fn migrate_user(raw: &str) -> Option<User> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    let user_value = match object.get("version") {
        None => value.clone(),
        Some(version) => {
            let version = version.as_u64()?;
            if version != u64::from(SESSION_SCHEMA_VERSION) {
                return None;
            }
            object.get("user")?.clone()
        }
    };

    if !user_value.is_object() {
        return None;
    }
    let user: User = serde_json::from_value(user_value).ok()?;
    if user.email.trim().is_empty() {
        return None;
    }
    Some(user)
}
