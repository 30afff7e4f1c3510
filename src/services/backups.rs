use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::{validate_id, UserBackupRecord};

/// Keeps one profile snapshot per identity subject
pub struct BackupManager<S> {
    store: Arc<S>,
}

impl<S> Clone for BackupManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: RecordStore> BackupManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Store a snapshot taken at `now`, replacing any earlier one
    pub async fn backup(
        &self,
        subject_id: &str,
        email: &str,
        given_name: &str,
        family_name: &str,
        now: DateTime<Utc>,
    ) -> Result<UserBackupRecord> {
        validate_id("subjectId", subject_id)?;

        let record = UserBackupRecord {
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            backup_timestamp: now,
        };
        self.store.put_backup(record.clone()).await?;

        tracing::info!("Profile backup stored for subject {}", subject_id);
        Ok(record)
    }

    /// Latest snapshot for the subject, for identity-restore workflows
    pub async fn restore_profile(&self, subject_id: &str) -> Result<UserBackupRecord> {
        validate_id("subjectId", subject_id)?;
        self.store
            .get_backup(subject_id)
            .await?
            .ok_or_else(|| AppError::BackupNotFound(subject_id.to_string()))
    }

    /// Drop the snapshot. Returns whether one existed.
    pub async fn discard(&self, subject_id: &str) -> Result<bool> {
        validate_id("subjectId", subject_id)?;
        let existed = self.store.delete_backup(subject_id).await?;
        if existed {
            tracing::info!("Profile backup discarded for subject {}", subject_id);
        }
        Ok(existed)
    }
}
