pub mod backup;
pub mod photo;

pub use backup::UserBackupRecord;
pub use photo::{PhotoRecord, PhotoStatus};

use crate::constants::{MAX_ID_LEN, MAX_LOCATOR_LEN};
use crate::error::{AppError, Result};

/// Validate a user, image or subject identifier.
///
/// Identifiers become (parts of) redb keys, so ASCII control characters are rejected.
pub fn validate_id(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    if value.len() > MAX_ID_LEN {
        return Err(AppError::InvalidInput(format!(
            "{} exceeds {} bytes",
            field, MAX_ID_LEN
        )));
    }
    if value.chars().any(|c| c.is_ascii_control()) {
        return Err(AppError::InvalidInput(format!(
            "{} contains control characters",
            field
        )));
    }
    Ok(())
}

/// Validate a file name or storage locator
pub fn validate_locator(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    if value.len() > MAX_LOCATOR_LEN {
        return Err(AppError::InvalidInput(format!(
            "{} exceeds {} bytes",
            field, MAX_LOCATOR_LEN
        )));
    }
    Ok(())
}
