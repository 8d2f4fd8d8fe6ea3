//! Persisted login session.
//!
//! The session lives in a single JSON file:
//! `{"token", "username", "api_url", "last_push_date"?}`. A missing file or a
//! missing/empty `token` means "not logged in". Writes replace the file
//! atomically (temp file + rename), so a reader never sees half a session.

use crate::config::DEFAULT_API_URL;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_push_date: Option<NaiveDate>,
}

impl Session {
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            "(unnamed)"
        } else {
            &self.username
        }
    }
}

/// Every field optional so that hand-edited or older files still load.
#[derive(Debug, Default, Deserialize)]
struct StoredSession {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    last_push_date: Option<NaiveDate>,
}

impl StoredSession {
    fn into_session(self) -> Option<Session> {
        let token = self.token.filter(|t| !t.is_empty())?;
        Some(Session {
            token,
            username: self.username.unwrap_or_default(),
            api_url: self
                .api_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            last_push_date: self.last_push_date,
        })
    }
}

/// Load/save seam for the session; commands never touch the filesystem directly.
pub trait SessionStore {
    /// Returns `None` when no usable session is stored.
    fn load(&self) -> Result<Option<Session>>;

    /// Replaces the stored session wholesale.
    fn save(&self, session: &Session) -> Result<()>;
}

/// Session stored in a JSON file on disk.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default per-user location.
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(crate::paths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {}", self.path.display()))?;

        match serde_json::from_str::<StoredSession>(&content) {
            Ok(stored) => Ok(stored.into_session()),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable config file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;

        let content =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        // Created owner-only and removed on drop, so a failed save leaves no token behind.
        let mut temp = NamedTempFile::new_in(parent).with_context(|| {
            format!("Failed to create temp config file in: {}", parent.display())
        })?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .context("Failed to write temp config file")?;

        temp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace config file: {}", self.path.display()))?;

        tracing::debug!("Saved session to {}", self.path.display());
        Ok(())
    }
}
