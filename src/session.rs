// Session context: bearer token and user info with an explicit load/save/clear lifecycle.
// Passed to the transport at construction; nothing reads tokens from ambient state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct SessionContext {
    path: Option<PathBuf>,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    /// Session that lives only as long as the process (tests, one-off runs).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(None),
        }
    }

    /// Session persisted as JSON at `path`. Call `load` to pick up a saved token.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            current: RwLock::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the persisted session, if any, and make it current.
    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        let loaded = match &self.path {
            Some(path) if path.exists() => {
                let s = std::fs::read_to_string(path)?;
                Some(serde_json::from_str::<Session>(&s)?)
            }
            _ => None,
        };
        *self.write_guard() = loaded.clone();
        Ok(loaded)
    }

    pub fn save(&self, session: Session) -> anyhow::Result<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_vec_pretty(&session)?)?;
        }
        *self.write_guard() = Some(session);
        Ok(())
    }

    /// Drop the in-memory session and remove the persisted one.
    pub fn clear(&self) -> anyhow::Result<()> {
        *self.write_guard() = None;
        if let Some(path) = &self.path
            && path.exists()
        {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }
}
