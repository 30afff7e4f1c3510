/// Default retention window for soft-deleted photos (days)
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Default interval between purge sweeps (1 hour)
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3600;

/// Default number of hard deletes a sweep keeps in flight
pub const DEFAULT_PURGE_CONCURRENCY: usize = 4;

/// Default upper bound for a single store call (5 seconds)
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Read-modify-write attempts before contention is reported as unavailable
pub const MAX_CAS_ATTEMPTS: usize = 5;

/// Maximum length of a user, image or subject identifier in bytes
pub const MAX_ID_LEN: usize = 256;

/// Maximum length of a file name or storage key in bytes
pub const MAX_LOCATOR_LEN: usize = 1024;

/// Separator between user ID and image ID in composite photo keys.
/// Identifiers may not contain control characters, so this never collides.
pub const KEY_SEPARATOR: char = '\u{1f}';

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for restoring a photo that is not deleted
pub const ERR_NOT_DELETED: &str = "Photo is not deleted";

/// Error message for exhausted read-modify-write retries
pub const ERR_CONTENTION: &str = "Too much concurrent activity on record";
