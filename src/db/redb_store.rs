//! `RecordStore` backed by an embedded redb database.
//!
//! redb is synchronous, so every call runs on the blocking pool under a
//! timeout. A call that times out surfaces `StoreUnavailable`; the blocking
//! transaction itself cannot be cancelled and may still commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, WriteTransaction,
};
use serde::Serialize;
use std::time::Duration;

use super::store::{DeletedPhotoRef, PhotoCondition, RecordStore, WriteOutcome};
use super::{decode, encode, photo_key, split_photo_key, tables, user_prefix, Db};
use crate::error::{AppError, Result};
use crate::models::{PhotoRecord, UserBackupRecord};

/// Record counts for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub photo_count: u64,
    pub deleted_photo_count: u64,
    pub backup_count: u64,
}

#[derive(Clone)]
pub struct RedbStore {
    db: Db,
    timeout: Duration,
}

impl RedbStore {
    pub fn new(db: Db, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Run a blocking redb operation with the configured timeout
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        let task = tokio::task::spawn_blocking(move || f(&db));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                tracing::warn!("Store operation {} timed out after {:?}", op, self.timeout);
                Err(AppError::StoreUnavailable(format!(
                    "{} timed out after {:?}",
                    op, self.timeout
                )))
            }
        }
    }

    /// Check that a read transaction can be opened
    pub async fn ping(&self) -> Result<()> {
        self.run("ping", |db| {
            let _ = db.begin_read()?;
            Ok(())
        })
        .await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.run("stats", |db| {
            let read_txn = db.begin_read()?;
            let photo_count = read_txn.open_table(tables::PHOTOS)?.len()?;
            let deleted_photo_count = read_txn.open_table(tables::DELETED_PHOTOS)?.len()?;
            let backup_count = read_txn.open_table(tables::USER_BACKUPS)?.len()?;

            Ok(StoreStats {
                photo_count,
                deleted_photo_count,
                backup_count,
            })
        })
        .await
    }
}

/// Read a photo inside a write transaction
fn read_photo(txn: &WriteTransaction, key: &str) -> Result<Option<PhotoRecord>> {
    let photos = txn.open_table(tables::PHOTOS)?;
    let record = photos
        .get(key)?
        .map(|bytes| decode::<PhotoRecord>(bytes.value()))
        .transpose()?;
    Ok(record)
}

/// Write a photo and keep the deleted-photo index in step with it
fn write_photo(txn: &WriteTransaction, key: &str, record: &PhotoRecord) -> Result<()> {
    let bytes = encode(record)?;
    let mut photos = txn.open_table(tables::PHOTOS)?;
    photos.insert(key, bytes.as_slice())?;
    drop(photos);

    let mut deleted = txn.open_table(tables::DELETED_PHOTOS)?;
    match record.deletion_date() {
        Some(at) => {
            let at_bytes = encode(&at)?;
            deleted.insert(key, at_bytes.as_slice())?;
        }
        None => {
            deleted.remove(key)?;
        }
    }
    Ok(())
}

/// Remove a photo and its index entry. Returns whether the photo existed.
fn remove_photo(txn: &WriteTransaction, key: &str) -> Result<bool> {
    let mut photos = txn.open_table(tables::PHOTOS)?;
    let existed = photos.remove(key)?.is_some();
    drop(photos);

    let mut deleted = txn.open_table(tables::DELETED_PHOTOS)?;
    deleted.remove(key)?;
    Ok(existed)
}

#[async_trait]
impl RecordStore for RedbStore {
    async fn put_photo(&self, record: PhotoRecord) -> Result<()> {
        let key = photo_key(&record.user_id, &record.image_id);
        self.run("put_photo", move |db| {
            let write_txn = db.begin_write()?;
            write_photo(&write_txn, &key, &record)?;
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn put_photo_if(
        &self,
        record: PhotoRecord,
        condition: PhotoCondition,
    ) -> Result<WriteOutcome> {
        let key = photo_key(&record.user_id, &record.image_id);
        self.run("put_photo_if", move |db| {
            let write_txn = db.begin_write()?;
            let current = read_photo(&write_txn, &key)?;
            if !condition.holds(current.as_ref()) {
                write_txn.abort()?;
                return Ok(WriteOutcome::ConditionFailed);
            }
            write_photo(&write_txn, &key, &record)?;
            write_txn.commit()?;
            Ok(WriteOutcome::Applied)
        })
        .await
    }

    async fn get_photo(&self, user_id: &str, image_id: &str) -> Result<Option<PhotoRecord>> {
        let key = photo_key(user_id, image_id);
        self.run("get_photo", move |db| {
            let read_txn = db.begin_read()?;
            let photos = read_txn.open_table(tables::PHOTOS)?;
            let record = photos
                .get(key.as_str())?
                .map(|bytes| decode::<PhotoRecord>(bytes.value()))
                .transpose()?;
            Ok(record)
        })
        .await
    }

    async fn list_photos_by_user(&self, user_id: &str) -> Result<Vec<PhotoRecord>> {
        let prefix = user_prefix(user_id);
        self.run("list_photos_by_user", move |db| {
            let read_txn = db.begin_read()?;
            let photos = read_txn.open_table(tables::PHOTOS)?;

            let mut records = Vec::new();
            for entry in photos.range(prefix.as_str()..)? {
                let (key, value) = entry?;
                if !key.value().starts_with(prefix.as_str()) {
                    break;
                }
                records.push(decode::<PhotoRecord>(value.value())?);
            }
            Ok(records)
        })
        .await
    }

    async fn delete_photo(&self, user_id: &str, image_id: &str) -> Result<bool> {
        let key = photo_key(user_id, image_id);
        self.run("delete_photo", move |db| {
            let write_txn = db.begin_write()?;
            let existed = remove_photo(&write_txn, &key)?;
            write_txn.commit()?;
            Ok(existed)
        })
        .await
    }

    async fn delete_photo_if(
        &self,
        user_id: &str,
        image_id: &str,
        condition: PhotoCondition,
    ) -> Result<WriteOutcome> {
        let key = photo_key(user_id, image_id);
        self.run("delete_photo_if", move |db| {
            let write_txn = db.begin_write()?;
            let current = read_photo(&write_txn, &key)?;
            if !condition.holds(current.as_ref()) {
                write_txn.abort()?;
                return Ok(WriteOutcome::ConditionFailed);
            }
            remove_photo(&write_txn, &key)?;
            write_txn.commit()?;
            Ok(WriteOutcome::Applied)
        })
        .await
    }

    async fn scan_deleted_photos(&self) -> Result<Vec<DeletedPhotoRef>> {
        self.run("scan_deleted_photos", |db| {
            let read_txn = db.begin_read()?;
            let deleted = read_txn.open_table(tables::DELETED_PHOTOS)?;

            let mut refs = Vec::new();
            for entry in deleted.iter()? {
                let (key, value) = entry?;
                let Some((user_id, image_id)) = split_photo_key(key.value()) else {
                    tracing::warn!("Skipping malformed deleted-photo key: {:?}", key.value());
                    continue;
                };
                let deletion_date: DateTime<Utc> = decode(value.value())?;
                refs.push(DeletedPhotoRef {
                    user_id: user_id.to_string(),
                    image_id: image_id.to_string(),
                    deletion_date,
                });
            }
            Ok(refs)
        })
        .await
    }

    async fn put_backup(&self, record: UserBackupRecord) -> Result<()> {
        self.run("put_backup", move |db| {
            let bytes = encode(&record)?;
            let write_txn = db.begin_write()?;
            {
                let mut backups = write_txn.open_table(tables::USER_BACKUPS)?;
                backups.insert(record.subject_id.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_backup(&self, subject_id: &str) -> Result<Option<UserBackupRecord>> {
        let subject_id = subject_id.to_string();
        self.run("get_backup", move |db| {
            let read_txn = db.begin_read()?;
            let backups = read_txn.open_table(tables::USER_BACKUPS)?;
            let record = backups
                .get(subject_id.as_str())?
                .map(|bytes| decode::<UserBackupRecord>(bytes.value()))
                .transpose()?;
            Ok(record)
        })
        .await
    }

    async fn delete_backup(&self, subject_id: &str) -> Result<bool> {
        let subject_id = subject_id.to_string();
        self.run("delete_backup", move |db| {
            let write_txn = db.begin_write()?;
            let existed = {
                let mut backups = write_txn.open_table(tables::USER_BACKUPS)?;
                backups.remove(subject_id.as_str())?.is_some()
            };
            write_txn.commit()?;
            Ok(existed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_database;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> RedbStore {
        let db = open_database(temp_dir.path().join("test.db")).unwrap();
        RedbStore::new(db, Duration::from_secs(5))
    }

    fn photo(user_id: &str, image_id: &str) -> PhotoRecord {
        PhotoRecord::new(
            user_id,
            image_id,
            format!("{}.jpg", image_id),
            format!("s3://bucket/{}/{}", user_id, image_id),
            "2024-01-01T00:00:00Z",
        )
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user_and_ordered() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        store.put_photo(photo("u1", "p2")).await.unwrap();
        store.put_photo(photo("u1", "p1")).await.unwrap();
        store.put_photo(photo("u10", "p1")).await.unwrap();
        store.put_photo(photo("u2", "p1")).await.unwrap();

        let listed = store.list_photos_by_user("u1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.image_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);

        assert!(store.list_photos_by_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_index_follows_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut record = photo("u1", "p1");
        store.put_photo(record.clone()).await.unwrap();
        assert!(store.scan_deleted_photos().await.unwrap().is_empty());

        record.soft_delete(at);
        store.put_photo(record.clone()).await.unwrap();
        assert_eq!(
            store.scan_deleted_photos().await.unwrap(),
            vec![DeletedPhotoRef {
                user_id: "u1".to_string(),
                image_id: "p1".to_string(),
                deletion_date: at,
            }]
        );

        record.restore();
        store.put_photo(record).await.unwrap();
        assert!(store.scan_deleted_photos().await.unwrap().is_empty());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.photo_count, 1);
        assert_eq!(stats.deleted_photo_count, 0);
    }

    #[tokio::test]
    async fn test_conditional_put_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let record = photo("u1", "p1");

        assert_eq!(
            store
                .put_photo_if(record.clone(), PhotoCondition::Absent)
                .await
                .unwrap(),
            WriteOutcome::Applied
        );
        assert_eq!(
            store
                .put_photo_if(record.clone(), PhotoCondition::Absent)
                .await
                .unwrap(),
            WriteOutcome::ConditionFailed
        );

        let at = Utc::now();
        assert_eq!(
            store
                .delete_photo_if("u1", "p1", PhotoCondition::DeletedAt(at))
                .await
                .unwrap(),
            WriteOutcome::ConditionFailed
        );
        assert!(store.get_photo("u1", "p1").await.unwrap().is_some());

        let mut deleted = record.clone();
        deleted.soft_delete(at);
        store
            .put_photo_if(deleted, PhotoCondition::Matches(record))
            .await
            .unwrap();
        assert_eq!(
            store
                .delete_photo_if("u1", "p1", PhotoCondition::DeletedAt(at))
                .await
                .unwrap(),
            WriteOutcome::Applied
        );
        assert!(store.get_photo("u1", "p1").await.unwrap().is_none());
        assert!(store.scan_deleted_photos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        assert!(!store.delete_photo("u1", "missing").await.unwrap());
        assert!(!store.delete_backup("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = test_store(&temp_dir);
            store.put_photo(photo("u1", "p1")).await.unwrap();
        }

        let store = test_store(&temp_dir);
        assert!(store.get_photo("u1", "p1").await.unwrap().is_some());
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_call_blocked_past_timeout_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_database(temp_dir.path().join("test.db")).unwrap();
        let store = RedbStore::new(db.clone(), Duration::from_millis(50));

        // Another writer holds redb's single write slot
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = std::thread::spawn(move || {
            let write_txn = db.begin_write().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(500));
            write_txn.abort().unwrap();
        });
        locked_rx.recv().unwrap();

        let err = store.put_photo(photo("u1", "p1")).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert!(err.is_transient());

        // Reads are not blocked by the writer
        assert!(store.get_photo("u1", "p1").await.unwrap().is_none());

        holder.join().unwrap();
    }
}
