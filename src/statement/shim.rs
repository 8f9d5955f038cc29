//! run/get/all over rusqlite's prepare/step API.
//!
//! Every call prepares its own statement and finalizes it before returning.
//! The statement and its cursor are owned locals, so they are released on
//! every exit path, including early returns through `?`.

use super::row::Row;
use rusqlite::{Connection, Params, Statement};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a data-modifying statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub last_insert_id: i64,
    pub rows_affected: usize,
}

fn column_names(stmt: &Statement<'_>) -> Arc<[String]> {
    stmt.column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
        .into()
}

/// Executes a single statement in autocommit mode.
pub fn run<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<RunResult> {
    let mut stmt = conn.prepare(sql)?;
    let rows_affected = stmt.execute(params)?;
    Ok(RunResult {
        last_insert_id: conn.last_insert_rowid(),
        rows_affected,
    })
}

/// First row of the result set, or `None` when there is none.
pub fn get<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<Option<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns = column_names(&stmt);
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(Row::read(row, &columns)?)),
        None => Ok(None),
    }
}

/// Every row of the result set, read eagerly.
pub fn all<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns = column_names(&stmt);
    let mut rows = stmt.query(params)?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(Row::read(row, &columns)?);
    }
    Ok(result)
}
