use exam_core::model::{Identity, Role};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn parse_role(s: &str) -> Result<Role, StorageError> {
    match s {
        "teacher" => Ok(Role::Teacher),
        "student" => Ok(Role::Student),
        _ => Err(StorageError::Serialization(format!("invalid role: {s}"))),
    }
}

pub(crate) fn map_identity_row(row: &sqlx::sqlite::SqliteRow) -> Result<Identity, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    if user_id.trim().is_empty() {
        return Err(StorageError::Serialization("empty user_id".into()));
    }

    Ok(Identity {
        user_id,
        name: row.try_get("name").map_err(ser)?,
        email: row.try_get("email").map_err(ser)?,
        role: parse_role(&row.try_get::<String, _>("role").map_err(ser)?)?,
    })
}
