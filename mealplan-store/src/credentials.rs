//! Household key storage
//!
//! A household key lets several devices share one namespace. The key is
//! read once when a store client picks its scope.

use mealplan_common::{Error, Result};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

pub trait CredentialStore: Send + Sync {
    fn household_key(&self) -> Option<String>;
    fn set_household_key(&self, key: &str) -> Result<()>;
    fn clear_household_key(&self) -> Result<()>;
}

/// Keys end up inside a collection path
fn validate_key(key: &str) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidInput("household key must not be empty".to_string()));
    }
    if key.contains('/') {
        return Err(Error::InvalidInput(
            "household key must not contain '/'".to_string(),
        ));
    }
    Ok(key.to_string())
}

/// Household key kept in a file under the root folder
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn household_key(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|content| content.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    fn set_household_key(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, &key)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!("Household key saved to {}", self.path.display());
        Ok(())
    }

    fn clear_household_key(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Household key removed");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_household_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn household_key(&self) -> Option<String> {
        self.key.lock().ok().and_then(|key| key.clone())
    }

    fn set_household_key(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        let mut stored = self
            .key
            .lock()
            .map_err(|_| Error::Internal("credential lock poisoned".to_string()))?;
        *stored = Some(key);
        Ok(())
    }

    fn clear_household_key(&self) -> Result<()> {
        let mut stored = self
            .key
            .lock()
            .map_err(|_| Error::Internal("credential lock poisoned".to_string()))?;
        *stored = None;
        Ok(())
    }
}
