pub mod redb_store;
pub mod store;
pub mod tables;

pub use redb_store::{RedbStore, StoreStats};
pub use store::{DeletedPhotoRef, PhotoCondition, RecordStore, WriteOutcome};

use redb::{Database, Error as RedbError};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::constants::KEY_SEPARATOR;
use crate::error::Result;

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Database handle type (Arc-wrapped for sharing across tasks)
pub type Db = Arc<Database>;

/// Open or create the redb database at the given path
///
/// Creates all required tables on first run.
#[allow(clippy::result_large_err)]
pub fn open_database(path: impl AsRef<Path>) -> std::result::Result<Db, RedbError> {
    tracing::info!("Opening database at: {:?}", path.as_ref());

    if let Some(parent) = path.as_ref().parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            tracing::error!("Failed to create database directory: {}", e);
            RedbError::Io(e)
        })?;
    }

    let db = Database::create(path)?;
    init_tables(&db)?;

    tracing::info!("Database initialized successfully");

    Ok(Arc::new(db))
}

/// Create tables if they don't exist by opening them
#[allow(clippy::result_large_err)]
pub fn init_tables(db: &Database) -> std::result::Result<(), RedbError> {
    let write_txn = db.begin_write()?;
    {
        let _ = write_txn.open_table(tables::PHOTOS)?;
        let _ = write_txn.open_table(tables::DELETED_PHOTOS)?;
        let _ = write_txn.open_table(tables::USER_BACKUPS)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Composite redb key for a photo
pub fn photo_key(user_id: &str, image_id: &str) -> String {
    format!("{}{}{}", user_id, KEY_SEPARATOR, image_id)
}

/// Key prefix covering every photo of one user
pub fn user_prefix(user_id: &str) -> String {
    format!("{}{}", user_id, KEY_SEPARATOR)
}

/// Split a composite photo key back into (user_id, image_id)
pub fn split_photo_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(KEY_SEPARATOR)
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, BINCODE_CONFIG)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_key_round_trip() {
        let key = photo_key("user-1", "img/2024/a.jpg");
        assert!(key.starts_with(&user_prefix("user-1")));
        assert_eq!(split_photo_key(&key), Some(("user-1", "img/2024/a.jpg")));
    }

    #[test]
    fn test_user_prefix_does_not_match_longer_user() {
        let key = photo_key("user-10", "p1");
        assert!(!key.starts_with(&user_prefix("user-1")));
    }
}
