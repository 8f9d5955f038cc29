use crate::durability::{load_image, snapshot, write_image, SnapshotTask};
use crate::error::{StoreError, StoreResult};
use crate::migration::{run_migrations, MigrationReport};
use crate::schema::ensure_base_schema;
use crate::statement::Database;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub image_path: PathBuf,
    /// `None` disables the periodic snapshot task.
    pub snapshot_interval: Option<Duration>,
}

/// Owns the engine for the lifetime of the process.
///
/// Statements go through [`Store::database`]; durability is handled here.
/// Dropping a `Store` without [`Store::shutdown`] behaves like a crash:
/// anything written since the last snapshot is lost.
pub struct Store {
    db: Database,
    image_path: PathBuf,
    migration_report: MigrationReport,
    snapshots: Mutex<Option<SnapshotTask>>,
}

impl Store {
    /// Loads the image, brings its schema up to date and, when an interval
    /// is configured, starts the snapshot task. Requires a tokio runtime in
    /// that case.
    pub fn initialize(options: &StoreOptions) -> StoreResult<Self> {
        let start = Instant::now();
        let mut conn = load_image(&options.image_path)?;
        ensure_base_schema(&conn)?;
        let migration_report = run_migrations(&mut conn)?;

        let store = Store {
            db: Database::new(conn),
            image_path: options.image_path.clone(),
            migration_report,
            snapshots: Mutex::new(None),
        };
        info!("Database ready in {:?}", start.elapsed());

        if let Some(interval) = options.snapshot_interval {
            store.start_snapshots(interval);
        }
        Ok(store)
    }

    /// Shared handle for running statements.
    pub fn database(&self) -> Database {
        self.db.clone()
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration_report
    }

    /// Starts the periodic snapshot task. No-op if one is already running.
    pub fn start_snapshots(&self, interval: Duration) {
        let mut guard = self
            .snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            warn!("Snapshot task already running, ignoring restart");
            return;
        }
        *guard = Some(SnapshotTask::spawn(
            self.db.clone(),
            self.image_path.clone(),
            interval,
        ));
    }

    /// Writes an image of the current state right away.
    pub fn flush_now(&self) -> StoreResult<()> {
        snapshot(&self.db, &self.image_path)
    }

    fn take_snapshot_task(&self) -> Option<SnapshotTask> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Synchronous shutdown: final image, then the engine is released. A
    /// failed write leaves the engine open.
    ///
    /// A running snapshot task is cancelled without waiting for it.
    pub fn close(self) -> StoreResult<()> {
        drop(self.take_snapshot_task());
        final_flush(&self.db, &self.image_path)
    }

    /// Stops the snapshot task, writes the final image and releases the
    /// engine. Later statements on any handle fail with
    /// [`StoreError::Closed`].
    ///
    /// A failed final write is logged and returned. The engine then stays
    /// open, so a handle from [`Store::database`] can still be snapshotted
    /// elsewhere.
    pub async fn shutdown(self) -> StoreResult<()> {
        if let Some(task) = self.take_snapshot_task() {
            task.stop().await;
        }

        let db = self.db.clone();
        let path = self.image_path.clone();
        tokio::task::spawn_blocking(move || final_flush(&db, &path))
            .await
            .map_err(|e| {
                StoreError::persistence(
                    &self.image_path,
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )
            })?
    }
}

fn final_flush(db: &Database, image_path: &Path) -> StoreResult<()> {
    // The engine is taken out under the same lock as the write, so nothing
    // lands after the final image.
    match db.release_after(|conn| write_image(conn, image_path)) {
        Ok(_conn) => {
            info!("Final database image written to {:?}", image_path);
            Ok(())
        }
        Err(StoreError::Closed) => Err(StoreError::Closed),
        Err(e) => {
            error!(
                "FINAL SNAPSHOT FAILED, database left open for another attempt: {}",
                e
            );
            Err(e)
        }
    }
}
