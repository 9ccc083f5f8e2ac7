use async_trait::async_trait;
use chrono::Utc;

use crate::repository::{IdentityRepository, StorageError};
use exam_core::model::Identity;

use super::SqliteRepository;
use super::mapping::map_identity_row;

#[async_trait]
impl IdentityRepository for SqliteRepository {
    async fn load_identity(&self) -> Result<Option<Identity>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, name, email, role
            FROM identity
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_identity_row).transpose()
    }

    async fn save_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO identity (id, user_id, name, email, role, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                name = excluded.name,
                email = excluded.email,
                role = excluded.role,
                saved_at = excluded.saved_at
            ",
        )
        .bind(1_i64)
        .bind(&identity.user_id)
        .bind(&identity.name)
        .bind(&identity.email)
        .bind(identity.role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_identity(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM identity WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
