//! Photo Vault
//!
//! Per-user photo metadata with a soft-delete lifecycle, profile backups, and a
//! background purge of photos deleted longer than the retention window.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

pub use config::Config;
pub use db::{open_database, Db, RecordStore, RedbStore};
pub use error::{AppError, Result};
pub use services::{BackupManager, PhotoLifecycle, PurgeScheduler};

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RedbStore>,
    pub photos: PhotoLifecycle<RedbStore>,
    pub purge: PurgeScheduler<RedbStore>,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState over an opened database
    pub fn new(db: Db, config: Config) -> Self {
        let store = Arc::new(RedbStore::new(db, config.store_timeout()));
        Self {
            photos: PhotoLifecycle::new(store.clone()),
            purge: PurgeScheduler::new(store.clone(), config.purge_config()),
            store,
            config,
        }
    }
}
