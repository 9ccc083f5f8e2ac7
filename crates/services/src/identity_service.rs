use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use exam_core::model::{Identity, Role, StudentId, TeacherId};
use storage::repository::{IdentityRepository, StorageError};

use crate::api::Authenticator;
use crate::error::IdentityError;

const MIN_PASSWORD_LEN: usize = 6;

/// Explicit holder of "who is signed in".
///
/// Created once at startup, `init` restores the remembered identity and
/// `clear` forgets it on logout.
pub struct IdentityService {
    repo: Arc<dyn IdentityRepository>,
    auth: Arc<dyn Authenticator>,
    current: RwLock<Option<Identity>>,
}

impl IdentityService {
    #[must_use]
    pub fn new(repo: Arc<dyn IdentityRepository>, auth: Arc<dyn Authenticator>) -> Self {
        Self {
            repo,
            auth,
            current: RwLock::new(None),
        }
    }

    /// Restore the remembered identity.
    ///
    /// A corrupt stored record is cleared and treated as signed out.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` if the store cannot be read or cleared.
    pub async fn init(&self) -> Result<Option<Identity>, IdentityError> {
        let loaded = match self.repo.load_identity().await {
            Ok(identity) => identity,
            Err(StorageError::Serialization(reason)) => {
                warn!(%reason, "discarding corrupt stored identity");
                self.repo.clear_identity().await?;
                None
            }
            Err(err) => return Err(err.into()),
        };

        *self.current.write().await = loaded.clone();
        Ok(loaded)
    }

    /// # Errors
    ///
    /// Returns `IdentityError::Api` for rejected credentials and
    /// `IdentityError::Storage` if the identity cannot be remembered.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Identity, IdentityError> {
        let identity = self.auth.login(email, password, role).await?;
        self.remember(identity).await
    }

    /// # Errors
    ///
    /// Returns `IdentityError::Api` or `IdentityError::Storage`.
    pub async fn student_login(&self, name: &str, email: &str) -> Result<Identity, IdentityError> {
        let identity = self.auth.student_login(name, email).await?;
        self.remember(identity).await
    }

    /// Register a teacher account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidRegistration` before contacting the
    /// backend if a field is unusable, then `IdentityError::Api` or
    /// `IdentityError::Storage`.
    pub async fn register_teacher(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() {
            return Err(IdentityError::InvalidRegistration("name is required"));
        }
        if email.is_empty() {
            return Err(IdentityError::InvalidRegistration("email is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::InvalidRegistration(
                "password must be at least 6 characters",
            ));
        }

        let identity = self.auth.register_teacher(name, email, password).await?;
        self.remember(identity).await
    }

    async fn remember(&self, identity: Identity) -> Result<Identity, IdentityError> {
        self.repo.save_identity(&identity).await?;
        info!(user_id = %identity.user_id, role = %identity.role, "signed in");
        *self.current.write().await = Some(identity.clone());
        Ok(identity)
    }

    pub async fn current(&self) -> Option<Identity> {
        self.current.read().await.clone()
    }

    /// The signed-in student's id.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotSignedIn` or `IdentityError::NotStudent`.
    pub async fn require_student(&self) -> Result<StudentId, IdentityError> {
        let current = self.current.read().await;
        let identity = current.as_ref().ok_or(IdentityError::NotSignedIn)?;
        identity.student_id().ok_or(IdentityError::NotStudent)
    }

    /// The signed-in teacher's id.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotSignedIn` or `IdentityError::NotTeacher`.
    pub async fn require_teacher(&self) -> Result<TeacherId, IdentityError> {
        let current = self.current.read().await;
        let identity = current.as_ref().ok_or(IdentityError::NotSignedIn)?;
        identity.teacher_id().ok_or(IdentityError::NotTeacher)
    }

    /// Sign out and forget the remembered identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` if the store cannot be cleared.
    pub async fn clear(&self) -> Result<(), IdentityError> {
        self.repo.clear_identity().await?;
        *self.current.write().await = None;
        info!("signed out");
        Ok(())
    }
}
