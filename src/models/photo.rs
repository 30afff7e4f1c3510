use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Processing status of an uploaded photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    Active,
    Processing,
    Failed,
}

impl PhotoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoStatus::Active => "active",
            PhotoStatus::Processing => "processing",
            PhotoStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PhotoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(PhotoStatus::Active),
            "processing" => Ok(PhotoStatus::Processing),
            "failed" => Ok(PhotoStatus::Failed),
            other => Err(AppError::InvalidInput(format!(
                "Unknown photo status: {}",
                other
            ))),
        }
    }
}

/// Photo metadata record stored in redb, one per (user_id, image_id)
///
/// The soft-delete flag and deletion date are private and only change
/// together through [`PhotoRecord::soft_delete`] and [`PhotoRecord::restore`],
/// so `deletion_date` is set exactly when the record is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    /// Owning user (partition key)
    pub user_id: String,
    /// Photo identifier, unique within the user's collection
    pub image_id: String,
    /// Original uploaded file name
    pub file_name: String,
    /// Opaque locator of the blob in external storage
    #[serde(rename = "s3Key")]
    pub storage_key: String,
    /// Upload timestamp as supplied by the uploader
    pub upload_date: String,
    /// Processing status
    pub status: PhotoStatus,
    is_deleted: bool,
    deletion_date: Option<DateTime<Utc>>,
}

impl PhotoRecord {
    /// Create a fresh record in the `processing` state
    pub fn new(
        user_id: impl Into<String>,
        image_id: impl Into<String>,
        file_name: impl Into<String>,
        storage_key: impl Into<String>,
        upload_date: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            image_id: image_id.into(),
            file_name: file_name.into(),
            storage_key: storage_key.into(),
            upload_date: upload_date.into(),
            status: PhotoStatus::Processing,
            is_deleted: false,
            deletion_date: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn deletion_date(&self) -> Option<DateTime<Utc>> {
        self.deletion_date
    }

    /// Mark the record deleted at `now`.
    ///
    /// Returns false (and keeps the original deletion date) if the record
    /// was already deleted.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_deleted {
            return false;
        }
        self.is_deleted = true;
        self.deletion_date = Some(now);
        true
    }

    /// Clear the soft-delete marker. Returns false if the record was not deleted.
    pub fn restore(&mut self) -> bool {
        if !self.is_deleted {
            return false;
        }
        self.is_deleted = false;
        self.deletion_date = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> PhotoRecord {
        PhotoRecord::new("u1", "p1", "a.jpg", "s3://bucket/p1", "2024-01-01T00:00:00Z")
    }

    fn invariant_holds(record: &PhotoRecord) -> bool {
        record.is_deleted() == record.deletion_date().is_some()
    }

    #[test]
    fn test_new_record_is_processing_and_live() {
        let record = sample();
        assert_eq!(record.status, PhotoStatus::Processing);
        assert!(!record.is_deleted());
        assert!(record.deletion_date().is_none());
    }

    #[test]
    fn test_soft_delete_keeps_first_deletion_date() {
        let mut record = sample();
        let first = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

        assert!(record.soft_delete(first));
        assert!(invariant_holds(&record));
        assert!(!record.soft_delete(second));
        assert_eq!(record.deletion_date(), Some(first));
    }

    #[test]
    fn test_restore_round_trip() {
        let original = sample();
        let mut record = original.clone();

        assert!(!record.restore());
        record.soft_delete(Utc::now());
        assert!(record.restore());
        assert!(invariant_holds(&record));
        assert_eq!(record, original);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("active".parse::<PhotoStatus>().unwrap(), PhotoStatus::Active);
        assert_eq!("FAILED".parse::<PhotoStatus>().unwrap(), PhotoStatus::Failed);
        assert!(matches!(
            "archived".parse::<PhotoStatus>(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_json_attribute_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["s3Key"], "s3://bucket/p1");
        assert_eq!(value["status"], "processing");
        assert_eq!(value["isDeleted"], false);
        assert!(value["deletionDate"].is_null());
    }
}
