//! Instagram session state and its on-disk persistence

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Device identifiers sent with every private API request.
///
/// Generated once at login and kept with the session so the account keeps
/// seeing the same device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIds {
    pub uuid: String,
    pub phone_id: String,
    pub device_id: String,
    pub advertising_id: String,
}

impl DeviceIds {
    /// Generate a fresh set of identifiers
    pub fn generate() -> Self {
        let android = uuid::Uuid::new_v4().simple().to_string();
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            phone_id: uuid::Uuid::new_v4().to_string(),
            device_id: format!("android-{}", &android[..16]),
            advertising_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// An authenticated Instagram session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub username: String,
    /// Our own account id, used to ignore messages we sent ourselves
    pub user_id: String,
    /// Value of the `Authorization` header (`Bearer IGT:2:...`)
    pub authorization: String,
    pub device: DeviceIds,
    pub user_agent: String,
    pub logged_in_at: DateTime<Utc>,
}

/// JSON file holding the last good [`SessionState`]
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Load the persisted session.
    ///
    /// Returns `Ok(None)` when no file exists. A file that exists but does not
    /// parse is an error.
    pub async fn load(&self) -> Result<Option<SessionState>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session = serde_json::from_str(&content)?;
        debug!("Loaded session from {}", self.path.display());
        Ok(Some(session))
    }

    pub async fn save(&self, session: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, content).await?;
        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    /// Delete the persisted session. Missing files are not an error.
    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
