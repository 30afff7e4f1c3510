//! Photo lifecycle: create, status updates, soft delete, restore, purge.
//!
//! Read-modify-write operations commit with a `Matches(current)` conditional
//! write, so a concurrent writer never has its change silently overwritten;
//! the loser re-reads and decides again.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::{ERR_CONTENTION, ERR_NOT_DELETED, MAX_CAS_ATTEMPTS};
use crate::db::{PhotoCondition, RecordStore, WriteOutcome};
use crate::error::{AppError, Result};
use crate::models::{validate_id, validate_locator, PhotoRecord, PhotoStatus};

pub struct PhotoLifecycle<S> {
    store: Arc<S>,
}

impl<S> Clone for PhotoLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

fn validate_key(user_id: &str, image_id: &str) -> Result<()> {
    validate_id("userId", user_id)?;
    validate_id("imageId", image_id)
}

impl<S: RecordStore> PhotoLifecycle<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a newly uploaded photo in the `processing` state.
    ///
    /// Fails with `PhotoAlreadyExists` if (user_id, image_id) is taken.
    pub async fn create(
        &self,
        user_id: &str,
        image_id: &str,
        file_name: &str,
        storage_key: &str,
        upload_date: &str,
    ) -> Result<PhotoRecord> {
        validate_key(user_id, image_id)?;
        validate_locator("fileName", file_name)?;
        validate_locator("storageKey", storage_key)?;
        validate_locator("uploadDate", upload_date)?;

        let record = PhotoRecord::new(user_id, image_id, file_name, storage_key, upload_date);
        match self
            .store
            .put_photo_if(record.clone(), PhotoCondition::Absent)
            .await?
        {
            WriteOutcome::Applied => {
                info!("Photo {} created for user {}", image_id, user_id);
                Ok(record)
            }
            WriteOutcome::ConditionFailed => Err(AppError::PhotoAlreadyExists {
                user_id: user_id.to_string(),
                image_id: image_id.to_string(),
            }),
        }
    }

    pub async fn get(&self, user_id: &str, image_id: &str) -> Result<PhotoRecord> {
        validate_key(user_id, image_id)?;
        self.store
            .get_photo(user_id, image_id)
            .await?
            .ok_or_else(|| AppError::photo_not_found(user_id, image_id))
    }

    /// Update the processing status. Setting the current status again is a no-op.
    pub async fn mark_status(
        &self,
        user_id: &str,
        image_id: &str,
        status: PhotoStatus,
    ) -> Result<PhotoRecord> {
        validate_key(user_id, image_id)?;
        let (record, _) = self
            .update(user_id, image_id, "mark_status", |record| {
                if record.status == status {
                    return Ok(false);
                }
                record.status = status;
                Ok(true)
            })
            .await?;
        Ok(record)
    }

    /// Soft-delete a photo at `now`.
    ///
    /// Deleting an already deleted photo succeeds without changes, keeping
    /// the original deletion date, so retried requests don't fail.
    pub async fn soft_delete(
        &self,
        user_id: &str,
        image_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PhotoRecord> {
        validate_key(user_id, image_id)?;
        let (record, changed) = self
            .update(user_id, image_id, "soft_delete", |record| {
                Ok(record.soft_delete(now))
            })
            .await?;
        if changed {
            info!("Photo {} soft-deleted for user {}", image_id, user_id);
        } else {
            debug!("Photo {} of user {} was already deleted", image_id, user_id);
        }
        Ok(record)
    }

    /// Undo a soft delete. Fails with `InvalidState` if the photo is not deleted.
    pub async fn restore(&self, user_id: &str, image_id: &str) -> Result<PhotoRecord> {
        validate_key(user_id, image_id)?;
        let (record, _) = self
            .update(user_id, image_id, "restore", |record| {
                if record.restore() {
                    Ok(true)
                } else {
                    Err(AppError::InvalidState(ERR_NOT_DELETED.to_string()))
                }
            })
            .await?;
        info!("Photo {} restored for user {}", image_id, user_id);
        Ok(record)
    }

    /// Remove a photo record outright. Returns whether it existed.
    pub async fn hard_delete(&self, user_id: &str, image_id: &str) -> Result<bool> {
        validate_key(user_id, image_id)?;
        let existed = self.store.delete_photo(user_id, image_id).await?;
        if existed {
            info!("Photo {} hard-deleted for user {}", image_id, user_id);
        } else {
            debug!("Hard delete of absent photo {} for user {}", image_id, user_id);
        }
        Ok(existed)
    }

    pub async fn list_active(&self, user_id: &str) -> Result<Vec<PhotoRecord>> {
        self.list_filtered(user_id, false).await
    }

    pub async fn list_deleted(&self, user_id: &str) -> Result<Vec<PhotoRecord>> {
        self.list_filtered(user_id, true).await
    }

    async fn list_filtered(&self, user_id: &str, deleted: bool) -> Result<Vec<PhotoRecord>> {
        validate_id("userId", user_id)?;
        let mut records = self.store.list_photos_by_user(user_id).await?;
        records.retain(|record| record.is_deleted() == deleted);
        Ok(records)
    }

    /// Read-modify-write with optimistic concurrency.
    ///
    /// `apply` mutates a copy of the stored record and returns whether it
    /// changed anything; an unchanged record is returned without writing.
    /// The flag in the result tells whether a write was committed.
    async fn update<F>(
        &self,
        user_id: &str,
        image_id: &str,
        op: &'static str,
        mut apply: F,
    ) -> Result<(PhotoRecord, bool)>
    where
        F: FnMut(&mut PhotoRecord) -> Result<bool> + Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self
                .store
                .get_photo(user_id, image_id)
                .await?
                .ok_or_else(|| AppError::photo_not_found(user_id, image_id))?;

            let mut updated = current.clone();
            if !apply(&mut updated)? {
                return Ok((current, false));
            }

            match self
                .store
                .put_photo_if(updated.clone(), PhotoCondition::Matches(current))
                .await?
            {
                WriteOutcome::Applied => return Ok((updated, true)),
                WriteOutcome::ConditionFailed => {
                    debug!(
                        "{} on photo {} of user {} raced another writer (attempt {})",
                        op, image_id, user_id, attempt
                    );
                }
            }
        }

        Err(AppError::StoreUnavailable(ERR_CONTENTION.to_string()))
    }
}
