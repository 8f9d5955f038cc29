//! Base schema bootstrap.
//!
//! Issues `CREATE TABLE IF NOT EXISTS` for every base table. Tables created
//! by an older build keep their old shape here; the migration engine brings
//! them forward afterwards.

mod tables;

pub use tables::*;

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;
use tracing::{debug, info};

/// Idempotently creates every base table. Safe on any schema age.
pub fn ensure_base_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|source| StoreError::SchemaInit {
            table: "pragma",
            source,
        })?;

    for table in BASE_TABLES {
        debug!("Ensuring table {}", table.name);
        table
            .create_if_absent(conn)
            .map_err(|source| StoreError::SchemaInit {
                table: table.name,
                source,
            })?;
    }
    info!("Base schema ensured ({} tables)", BASE_TABLES.len());
    Ok(())
}
