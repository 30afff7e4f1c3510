use redb::TableDefinition;

/// Photos table: "user_id␟image_id" -> PhotoRecord (serialized)
pub const PHOTOS: TableDefinition<&str, &[u8]> = TableDefinition::new("photos");

/// Deleted photos index: "user_id␟image_id" -> deletion date (serialized)
/// Written in the same transaction as PHOTOS; used by the purge sweep
pub const DELETED_PHOTOS: TableDefinition<&str, &[u8]> = TableDefinition::new("deleted_photos");

/// User backups table: subject_id -> UserBackupRecord (serialized)
pub const USER_BACKUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_backups");
