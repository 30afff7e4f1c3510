//! Lifecycle managers built on top of a [`RecordStore`](crate::db::RecordStore).

pub mod backups;
pub mod photos;
pub mod purge;

pub use backups::BackupManager;
pub use photos::PhotoLifecycle;
pub use purge::{PurgeConfig, PurgeHandle, PurgeOutcome, PurgeReport, PurgeScheduler};
