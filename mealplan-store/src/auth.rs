//! Authentication providers
//!
//! The store only needs a user id. When nobody is signed in an anonymous
//! session is created; if that fails the session cannot proceed.

use async_trait::async_trait;
use mealplan_common::{uuid_utils, Error, Result};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Id of the signed-in user, if any
    fn current_user(&self) -> Option<String>;

    /// Create an anonymous session and return its user id
    async fn sign_in_anonymously(&self) -> Result<String>;
}

/// Return the current user, signing in anonymously when there is none
pub async fn ensure_authenticated(auth: &dyn AuthProvider) -> Result<String> {
    if let Some(uid) = auth.current_user() {
        return Ok(uid);
    }

    match auth.sign_in_anonymously().await {
        Ok(uid) => {
            info!("Signed in anonymously as {}", uid);
            Ok(uid)
        }
        Err(e) => {
            warn!("Anonymous sign-in failed: {}", e);
            Err(match e {
                Error::Authentication(_) => e,
                other => Error::Authentication(other.to_string()),
            })
        }
    }
}

/// Anonymous identity persisted in a session file
pub struct LocalAuthProvider {
    session_path: PathBuf,
    uid: Mutex<Option<String>>,
}

impl LocalAuthProvider {
    /// Restores an existing session from `session_path` if one was saved
    pub fn new(session_path: PathBuf) -> Self {
        let uid = std::fs::read_to_string(&session_path)
            .ok()
            .map(|content| content.trim().to_string())
            .filter(|uid| !uid.is_empty());
        Self {
            session_path,
            uid: Mutex::new(uid),
        }
    }

    /// Forget the session, on disk and in memory
    pub fn sign_out(&self) -> Result<()> {
        if self.session_path.exists() {
            std::fs::remove_file(&self.session_path)?;
        }
        *self.lock_uid()? = None;
        Ok(())
    }

    fn lock_uid(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.uid
            .lock()
            .map_err(|_| Error::Internal("session lock poisoned".to_string()))
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    fn current_user(&self) -> Option<String> {
        self.uid.lock().ok().and_then(|uid| uid.clone())
    }

    async fn sign_in_anonymously(&self) -> Result<String> {
        let uid = uuid_utils::generate_id();

        if let Some(parent) = self.session_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Authentication(e.to_string()))?;
        }
        tokio::fs::write(&self.session_path, &uid)
            .await
            .map_err(|e| Error::Authentication(e.to_string()))?;

        *self.lock_uid()? = Some(uid.clone());
        Ok(uid)
    }
}

/// Fixed identity for tests
pub struct StaticAuthProvider {
    signed_in: Mutex<Option<String>>,
    anonymous_uid: Option<String>,
}

impl StaticAuthProvider {
    /// Already signed in as `uid`
    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self {
            signed_in: Mutex::new(Some(uid.into())),
            anonymous_uid: None,
        }
    }

    /// Not signed in; anonymous sign-in yields `uid`
    pub fn signed_out(uid: impl Into<String>) -> Self {
        Self {
            signed_in: Mutex::new(None),
            anonymous_uid: Some(uid.into()),
        }
    }

    /// Not signed in, and anonymous sign-in fails
    pub fn failing() -> Self {
        Self {
            signed_in: Mutex::new(None),
            anonymous_uid: None,
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    fn current_user(&self) -> Option<String> {
        self.signed_in.lock().ok().and_then(|uid| uid.clone())
    }

    async fn sign_in_anonymously(&self) -> Result<String> {
        let uid = self
            .anonymous_uid
            .clone()
            .ok_or_else(|| Error::Authentication("anonymous sign-in is disabled".to_string()))?;
        if let Ok(mut signed_in) = self.signed_in.lock() {
            *signed_in = Some(uid.clone());
        }
        Ok(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_existing_session_is_reused() {
        let auth = StaticAuthProvider::signed_in("alice");
        assert_eq!(ensure_authenticated(&auth).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_signs_in_anonymously_when_signed_out() {
        let auth = StaticAuthProvider::signed_out("anon-1");
        assert_eq!(auth.current_user(), None);
        assert_eq!(ensure_authenticated(&auth).await.unwrap(), "anon-1");
        assert_eq!(auth.current_user().as_deref(), Some("anon-1"));
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_authentication_error() {
        let auth = StaticAuthProvider::failing();
        assert!(matches!(
            ensure_authenticated(&auth).await,
            Err(Error::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_local_session_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let session = temp_dir.path().join("session");

        let first = LocalAuthProvider::new(session.clone());
        let uid = ensure_authenticated(&first).await.unwrap();

        let second = LocalAuthProvider::new(session);
        assert_eq!(second.current_user(), Some(uid));

        second.sign_out().unwrap();
        assert_eq!(second.current_user(), None);
    }
}
