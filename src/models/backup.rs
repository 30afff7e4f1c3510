use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a user's profile attributes, one live record per subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBackupRecord {
    /// Stable identity-provider subject (partition key)
    #[serde(rename = "sub")]
    pub subject_id: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    /// When this snapshot was taken
    pub backup_timestamp: DateTime<Utc>,
}
