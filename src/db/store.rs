//! Record store contract for photo and backup records.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::error::Result;
use crate::models::{PhotoRecord, UserBackupRecord};

/// Precondition checked atomically with a conditional photo write
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoCondition {
    /// No record exists under the key
    Absent,
    /// The stored record equals this one field for field
    Matches(PhotoRecord),
    /// The stored record is deleted with exactly this deletion date
    DeletedAt(DateTime<Utc>),
}

impl PhotoCondition {
    /// Evaluate against the currently stored record (if any)
    pub fn holds(&self, current: Option<&PhotoRecord>) -> bool {
        match (self, current) {
            (PhotoCondition::Absent, current) => current.is_none(),
            (PhotoCondition::Matches(expected), Some(current)) => expected == current,
            (PhotoCondition::DeletedAt(at), Some(current)) => {
                current.is_deleted() && current.deletion_date() == Some(*at)
            }
            (_, None) => false,
        }
    }
}

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    ConditionFailed,
}

/// Entry of the deleted-photo index, as seen by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedPhotoRef {
    pub user_id: String,
    pub image_id: String,
    pub deletion_date: DateTime<Utc>,
}

impl DeletedPhotoRef {
    /// Deleted for at least `retention` as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>, retention: TimeDelta) -> bool {
        now.signed_duration_since(self.deletion_date) >= retention
    }
}

/// Durable key-value persistence for photo and backup records.
///
/// Every operation is atomic for the single record it touches. Absence is
/// reported as `None`/`false`/`ConditionFailed`, never as an error; errors
/// are store failures (`StoreUnavailable` and backend variants).
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Upsert a photo keyed by (user_id, image_id)
    async fn put_photo(&self, record: PhotoRecord) -> Result<()>;

    /// Upsert a photo only if `condition` holds for the stored record
    async fn put_photo_if(
        &self,
        record: PhotoRecord,
        condition: PhotoCondition,
    ) -> Result<WriteOutcome>;

    async fn get_photo(&self, user_id: &str, image_id: &str) -> Result<Option<PhotoRecord>>;

    /// All photos of a user, ordered by image ID
    async fn list_photos_by_user(&self, user_id: &str) -> Result<Vec<PhotoRecord>>;

    /// Remove a photo. Returns whether a record existed.
    async fn delete_photo(&self, user_id: &str, image_id: &str) -> Result<bool>;

    /// Remove a photo only if `condition` holds for the stored record
    async fn delete_photo_if(
        &self,
        user_id: &str,
        image_id: &str,
        condition: PhotoCondition,
    ) -> Result<WriteOutcome>;

    /// Every soft-deleted photo across all users
    async fn scan_deleted_photos(&self) -> Result<Vec<DeletedPhotoRef>>;

    /// Upsert a backup keyed by subject ID
    async fn put_backup(&self, record: UserBackupRecord) -> Result<()>;

    async fn get_backup(&self, subject_id: &str) -> Result<Option<UserBackupRecord>>;

    /// Remove a backup. Returns whether a record existed.
    async fn delete_backup(&self, subject_id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_condition_evaluation() {
        let live = PhotoRecord::new("u1", "p1", "a.jpg", "s3://b/p1", "2024-01-01T00:00:00Z");
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut deleted = live.clone();
        deleted.soft_delete(at);

        assert!(PhotoCondition::Absent.holds(None));
        assert!(!PhotoCondition::Absent.holds(Some(&live)));

        assert!(PhotoCondition::Matches(live.clone()).holds(Some(&live)));
        assert!(!PhotoCondition::Matches(live.clone()).holds(Some(&deleted)));
        assert!(!PhotoCondition::Matches(live.clone()).holds(None));

        assert!(PhotoCondition::DeletedAt(at).holds(Some(&deleted)));
        assert!(!PhotoCondition::DeletedAt(at).holds(Some(&live)));
        assert!(!PhotoCondition::DeletedAt(at + TimeDelta::seconds(1)).holds(Some(&deleted)));
        assert!(!PhotoCondition::DeletedAt(at).holds(None));
    }

    #[test]
    fn test_expiry_boundary() {
        let deleted_at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let retention = TimeDelta::days(30);
        let candidate = DeletedPhotoRef {
            user_id: "u1".to_string(),
            image_id: "p1".to_string(),
            deletion_date: deleted_at,
        };

        assert!(!candidate.is_expired(deleted_at + TimeDelta::days(8), retention));
        assert!(!candidate.is_expired(deleted_at + retention - TimeDelta::seconds(1), retention));
        assert!(candidate.is_expired(deleted_at + retention, retention));
    }
}
