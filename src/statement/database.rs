use super::row::Row;
use super::shim::{self, RunResult};
use crate::error::{StoreError, StoreResult};
use rusqlite::{Connection, Params, Transaction};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to the single in-memory engine.
///
/// Every statement and every snapshot holds the same lock from prepare until
/// the result is fully materialized, so no two of them ever interleave.
/// Clones share the engine.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl Database {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        // A panic while holding the lock cannot leave the connection itself
        // half-updated: SQLite rolls back the interrupted statement.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        f(conn)
    }

    pub fn run<P: Params>(&self, sql: &str, params: P) -> StoreResult<RunResult> {
        self.with_connection(|conn| Ok(shim::run(conn, sql, params)?))
    }

    pub fn get<P: Params>(&self, sql: &str, params: P) -> StoreResult<Option<Row>> {
        self.with_connection(|conn| Ok(shim::get(conn, sql, params)?))
    }

    pub fn all<P: Params>(&self, sql: &str, params: P) -> StoreResult<Vec<Row>> {
        self.with_connection(|conn| Ok(shim::all(conn, sql, params)?))
    }

    /// Runs `f` inside one transaction, committed only if `f` succeeds.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }

    /// Runs `f` and takes the engine out once it succeeds, with no other
    /// statement in between. Later calls on any clone fail with
    /// [`StoreError::Closed`]. On failure the engine stays in place.
    pub(crate) fn release_after(
        &self,
        f: impl FnOnce(&Connection) -> StoreResult<()>,
    ) -> StoreResult<Connection> {
        let mut guard = self.lock();
        f(guard.as_ref().ok_or(StoreError::Closed)?)?;
        guard.take().ok_or(StoreError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }
}
