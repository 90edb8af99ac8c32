use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// What gets written to disk between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub manual_email: String,
    pub saved_at: DateTime<Utc>,
}

/// Remembers the last applied manual email. Last write wins; a missing or
/// unreadable file simply means nothing is remembered.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: Some(dir.as_ref().join(SESSION_FILE)),
        }
    }

    /// A store that never persists anything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn from_state_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::in_dir).unwrap_or_else(Self::disabled)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn load(&self) -> Option<StoredSession> {
        let path = self.path.as_ref()?;
        let data = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&data) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "ignoring unreadable session file");
                None
            }
        }
    }

    pub async fn remembered_email(&self) -> Option<String> {
        self.load()
            .await
            .map(|s| s.manual_email)
            .filter(|email| !email.is_empty())
    }

    pub async fn remember(&self, email: &str) -> Result<(), SessionError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let session = StoredSession {
            manual_email: email.to_string(),
            saved_at: Utc::now(),
        };
        tokio::fs::write(path, serde_json::to_string_pretty(&session)?).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStore;

    #[tokio::test]
    async fn remember_then_load_round_trips_last_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path().join("nested"));
        assert_eq!(store.remembered_email().await, None);

        store.remember("Sincere@april.biz").await.unwrap();
        store.remember("Shanna@melissa.tv").await.unwrap();
        assert_eq!(store.remembered_email().await.as_deref(), Some("Shanna@melissa.tv"));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_nothing_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        std::fs::write(store.path().unwrap(), "{not json").unwrap();
        assert_eq!(store.remembered_email().await, None);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        store.remember("a@b.co").await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.remembered_email().await, None);
    }

    #[tokio::test]
    async fn disabled_store_persists_nothing() {
        let store = SessionStore::disabled();
        store.remember("a@b.co").await.unwrap();
        assert_eq!(store.remembered_email().await, None);
        assert!(store.path().is_none());
    }
}
