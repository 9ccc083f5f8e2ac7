use async_trait::async_trait;
use exam_core::model::Identity;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the signed-in identity.
///
/// At most one identity is remembered at a time; saving replaces it.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Load the remembered identity, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored record is corrupt,
    /// or other storage errors.
    async fn load_identity(&self) -> Result<Option<Identity>, StorageError>;

    /// Remember `identity`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the identity cannot be stored.
    async fn save_identity(&self, identity: &Identity) -> Result<(), StorageError>;

    /// Forget the remembered identity. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be updated.
    async fn clear_identity(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    identity: Arc<Mutex<Option<Identity>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryRepository {
    async fn load_identity(&self) -> Result<Option<Identity>, StorageError> {
        let guard = self
            .identity
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        let mut guard = self
            .identity
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(identity.clone());
        Ok(())
    }

    async fn clear_identity(&self) -> Result<(), StorageError> {
        let mut guard = self
            .identity
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub identity: Arc<dyn IdentityRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let identity: Arc<dyn IdentityRepository> = Arc::new(InMemoryRepository::new());
        Self { identity }
    }
}
