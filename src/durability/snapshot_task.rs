use super::image::snapshot;
use crate::error::StoreError;
use crate::statement::Database;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counters of the periodic snapshot loop.
#[derive(Debug, Default)]
pub struct SnapshotStats {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl SnapshotStats {
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Background task writing a full image every `interval`.
///
/// A failed snapshot is logged and retried on the next tick. Dropping the
/// task cancels it without waiting; use [`SnapshotTask::stop`] to wait for
/// an in-flight snapshot to finish.
pub struct SnapshotTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    stats: Arc<SnapshotStats>,
}

impl SnapshotTask {
    pub fn spawn(db: Database, image_path: PathBuf, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let stats = Arc::new(SnapshotStats::default());

        info!(
            "Snapshotting database to {:?} every {:?}",
            image_path, interval
        );

        let handle = tokio::spawn(run_loop(
            db,
            image_path,
            interval,
            token.clone(),
            stats.clone(),
        ));

        Self {
            token,
            handle: Some(handle),
            stats,
        }
    }

    pub fn stats(&self) -> Arc<SnapshotStats> {
        self.stats.clone()
    }

    /// Cancels the loop and waits until it has exited.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Snapshot task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SnapshotTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_loop(
    db: Database,
    image_path: PathBuf,
    interval: Duration,
    token: CancellationToken,
    stats: Arc<SnapshotStats>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the first immediate tick, wait for the first interval
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = token.cancelled() => {
                debug!("Snapshot task shutting down");
                break;
            }
        }

        let db = db.clone();
        let path = image_path.clone();
        let result = tokio::task::spawn_blocking(move || snapshot(&db, &path)).await;

        match result {
            Ok(Ok(())) => {
                stats.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(StoreError::Closed)) => {
                debug!("Database closed, stopping snapshots");
                break;
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!("Periodic snapshot failed, retrying next tick: {}", e);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!("Periodic snapshot panicked: {}", e);
            }
        }
    }
}
