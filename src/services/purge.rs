//! Background purge of soft-deleted photos past the retention window.
//!
//! Each sweep reads the deleted-photo index and hard-deletes eligible records
//! with a conditional delete on the scanned deletion date. A photo restored
//! (or deleted again) after the scan fails the condition and is skipped.

use chrono::{DateTime, TimeDelta, Utc};
use futures::{future, stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::constants::{
    DEFAULT_PURGE_CONCURRENCY, DEFAULT_PURGE_INTERVAL_SECS, DEFAULT_RETENTION_DAYS,
};
use crate::db::{DeletedPhotoRef, PhotoCondition, RecordStore, WriteOutcome};

#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// How long a photo stays soft-deleted before it is purged
    pub retention: TimeDelta,
    /// Time between sweeps
    pub interval: Duration,
    /// Maximum hard deletes in flight during a sweep
    pub concurrency: usize,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            retention: TimeDelta::days(DEFAULT_RETENTION_DAYS),
            interval: Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS),
            concurrency: DEFAULT_PURGE_CONCURRENCY,
        }
    }
}

/// What happened to a single purge candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// Record removed from the store
    Purged,
    /// Record no longer matched the scan (restored, re-deleted or gone)
    Skipped,
    /// Store error; the next sweep retries
    Failed,
}

/// Aggregate result of one sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub started_at: DateTime<Utc>,
    pub scanned: usize,
    pub eligible: usize,
    pub purged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Eligible records not attempted because the sweep was cancelled
    pub cancelled: usize,
    /// The deleted-photo scan itself failed
    pub scan_failed: bool,
}

impl PurgeReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            scanned: 0,
            eligible: 0,
            purged: 0,
            skipped: 0,
            failed: 0,
            cancelled: 0,
            scan_failed: false,
        }
    }
}

pub struct PurgeScheduler<S> {
    store: Arc<S>,
    config: PurgeConfig,
    last_report: Arc<RwLock<Option<PurgeReport>>>,
}

impl<S> Clone for PurgeScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            last_report: self.last_report.clone(),
        }
    }
}

/// Running scheduler task
pub struct PurgeHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PurgeHandle {
    /// Stop scheduling sweeps and wait for the task to finish.
    ///
    /// A sweep in progress stops issuing new deletes; deletes already
    /// issued complete.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Purge scheduler task failed: {}", e);
        }
    }
}

impl<S: RecordStore> PurgeScheduler<S> {
    pub fn new(store: Arc<S>, config: PurgeConfig) -> Self {
        Self {
            store,
            config,
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    /// Report of the most recent completed sweep
    pub async fn last_report(&self) -> Option<PurgeReport> {
        self.last_report.read().await.clone()
    }

    /// Spawn the periodic sweep loop
    pub fn start(&self) -> PurgeHandle {
        let (shutdown, rx) = watch::channel(false);
        let scheduler = self.clone();
        let task = tokio::spawn(async move { scheduler.run(rx).await });
        PurgeHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting purge scheduler (every {:?}, retention {} days)",
            self.config.interval,
            self.config.retention.num_days()
        );

        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await; // Skip the first immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            if *shutdown.borrow() {
                break;
            }

            self.sweep_cancellable(Utc::now(), &shutdown).await;
        }

        info!("Purge scheduler stopped");
    }

    /// Run one full sweep as of `now`
    pub async fn sweep(&self, now: DateTime<Utc>) -> PurgeReport {
        let (_keep_open, never_cancelled) = watch::channel(false);
        self.sweep_cancellable(now, &never_cancelled).await
    }

    /// Run one sweep, stopping early once `cancel` reads true
    pub async fn sweep_cancellable(
        &self,
        now: DateTime<Utc>,
        cancel: &watch::Receiver<bool>,
    ) -> PurgeReport {
        let mut report = PurgeReport::new(now);

        let candidates = match self.store.scan_deleted_photos().await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Purge sweep could not scan deleted photos: {}", e);
                report.scan_failed = true;
                *self.last_report.write().await = Some(report.clone());
                return report;
            }
        };
        report.scanned = candidates.len();

        let retention = self.config.retention;
        let eligible: Vec<DeletedPhotoRef> = candidates
            .into_iter()
            .filter(|c| c.is_expired(now, retention))
            .collect();
        report.eligible = eligible.len();

        let outcomes: Vec<PurgeOutcome> = stream::iter(eligible)
            .take_while(|_| future::ready(!*cancel.borrow()))
            .map(|candidate| async move { self.purge_one(&candidate).await })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for outcome in &outcomes {
            match outcome {
                PurgeOutcome::Purged => report.purged += 1,
                PurgeOutcome::Skipped => report.skipped += 1,
                PurgeOutcome::Failed => report.failed += 1,
            }
        }
        report.cancelled = report.eligible - outcomes.len();

        if report.failed > 0 || report.cancelled > 0 {
            warn!(
                "Purge sweep finished with {} failed and {} cancelled of {} eligible",
                report.failed, report.cancelled, report.eligible
            );
        }
        if report.eligible > 0 {
            info!(
                "Purge sweep: scanned {}, purged {}, skipped {}",
                report.scanned, report.purged, report.skipped
            );
        } else {
            debug!("Purge sweep: nothing eligible among {} deleted", report.scanned);
        }

        *self.last_report.write().await = Some(report.clone());
        report
    }

    /// Hard-delete one candidate if it is still deleted at the scanned date
    pub async fn purge_one(&self, candidate: &DeletedPhotoRef) -> PurgeOutcome {
        let condition = PhotoCondition::DeletedAt(candidate.deletion_date);
        match self
            .store
            .delete_photo_if(&candidate.user_id, &candidate.image_id, condition)
            .await
        {
            Ok(WriteOutcome::Applied) => {
                info!(
                    "Purged photo {} of user {} (deleted {})",
                    candidate.image_id, candidate.user_id, candidate.deletion_date
                );
                PurgeOutcome::Purged
            }
            Ok(WriteOutcome::ConditionFailed) => {
                debug!(
                    "Photo {} of user {} changed since scan, skipping",
                    candidate.image_id, candidate.user_id
                );
                PurgeOutcome::Skipped
            }
            Err(e) => {
                error!(
                    "Failed to purge photo {} of user {}: {}",
                    candidate.image_id, candidate.user_id, e
                );
                PurgeOutcome::Failed
            }
        }
    }
}
