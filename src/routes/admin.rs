use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::{
    AppError, AppState, config::Config, db::StoreStats, error::Result, services::PurgeReport,
};

/// Query parameters shared by admin endpoints
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Admin secret key for authentication
    pub key: String,
}

/// Database statistics response
#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    #[serde(flatten)]
    pub counts: StoreStats,
    pub database_size_bytes: u64,
    pub database_size_human: String,
    pub retention_days: i64,
    pub last_purge: Option<PurgeReport>,
}

#[derive(Debug, Serialize)]
pub struct HardDeleteResponse {
    pub success: bool,
    pub existed: bool,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Admin endpoints are enabled only when a secret key is configured
fn authorize(config: &Config, key: &str) -> Result<()> {
    let admin_key = config
        .admin_secret_key
        .as_ref()
        .ok_or(AppError::Unauthorized)?;

    if key != admin_key.as_str() {
        tracing::warn!("Invalid admin key attempt");
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Admin stats endpoint
///
/// Returns record counts, database size and the last purge sweep.
///
/// GET /admin/stats?key=<admin_secret_key>
pub async fn admin_stats(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<AdminStatsResponse>> {
    authorize(&state.config, &params.key)?;

    let database_size_bytes = fs::metadata(&state.config.database_path)
        .map(|m| m.len())
        .unwrap_or(0);
    let counts = state.store.stats().await?;

    tracing::info!(
        "Admin stats requested: {} photos ({} deleted), {} backups, {} database",
        counts.photo_count,
        counts.deleted_photo_count,
        counts.backup_count,
        format_bytes(database_size_bytes)
    );

    Ok(Json(AdminStatsResponse {
        counts,
        database_size_bytes,
        database_size_human: format_bytes(database_size_bytes),
        retention_days: state.config.retention_days,
        last_purge: state.purge.last_report().await,
    }))
}

/// Run a purge sweep immediately
///
/// POST /admin/purge?key=<admin_secret_key>
pub async fn run_purge(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<PurgeReport>> {
    authorize(&state.config, &params.key)?;

    tracing::info!("Admin-triggered purge sweep");
    let report = state.purge.sweep(Utc::now()).await;
    Ok(Json(report))
}

/// Hard-delete a single photo record regardless of its state
///
/// DELETE /admin/photos/:user_id/:image_id?key=<admin_secret_key>
pub async fn hard_delete_photo(
    State(state): State<AppState>,
    Path((user_id, image_id)): Path<(String, String)>,
    Query(params): Query<AdminQuery>,
) -> Result<Json<HardDeleteResponse>> {
    authorize(&state.config, &params.key)?;

    let existed = state.photos.hard_delete(&user_id, &image_id).await?;
    Ok(Json(HardDeleteResponse {
        success: true,
        existed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_authorize() {
        let mut config = Config::from_lookup(|_| None).unwrap();
        assert!(matches!(
            authorize(&config, "anything"),
            Err(AppError::Unauthorized)
        ));

        config.admin_secret_key = Some("admin".to_string());
        assert!(authorize(&config, "admin").is_ok());
        assert!(authorize(&config, "nope").is_err());
    }
}
