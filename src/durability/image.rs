use crate::error::{StoreError, StoreResult};
use crate::statement::Database;
use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName};
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Opens a fresh in-memory engine, filled from the image at `path` if one exists.
pub fn load_image(path: &Path) -> StoreResult<Connection> {
    let mut conn = Connection::open_in_memory().map_err(|e| StoreError::persistence(path, e))?;
    if path.exists() {
        info!("Loading database image from {:?}", path);
        let start = Instant::now();
        conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)
            .map_err(|e| StoreError::persistence(path, e))?;
        info!("Database image loaded in {:?}", start.elapsed());
    } else {
        info!("No database image at {:?}, starting from an empty database", path);
    }
    Ok(conn)
}

/// Serializes the whole engine into `path`.
///
/// The image is written next to the target and renamed over it once
/// complete, so readers only ever see the previous or the new image.
pub fn write_image(conn: &Connection, path: &Path) -> StoreResult<()> {
    let start = Instant::now();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::persistence(path, e))?;
    conn.backup(DatabaseName::Main, tmp.path(), None)
        .map_err(|e| StoreError::persistence(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::persistence(path, e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::persistence(path, e.error))?;
    debug!("Wrote database image to {:?} in {:?}", path, start.elapsed());
    Ok(())
}

/// Snapshot of a live handle. Holds the engine lock for the whole
/// serialization, so no statement runs concurrently with it.
pub fn snapshot(db: &Database, path: &Path) -> StoreResult<()> {
    db.with_connection(|conn| write_image(conn, path))
}
