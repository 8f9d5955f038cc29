//! Adds declared columns that older builds never created and that need no
//! data movement (nullable, or with a default).

use crate::schema::BASE_TABLES;
use crate::sqlite_persistence::{Column, Table};
use rusqlite::Connection;
use tracing::info;

fn addable_missing(conn: &Connection) -> rusqlite::Result<Vec<(&'static Table, &'static Column)>> {
    let mut result = Vec::new();
    for table in BASE_TABLES {
        for name in table.missing_columns(conn)? {
            if let Some(column) = table.column(name).filter(|c| c.is_addable()) {
                result.push((table, column));
            }
        }
    }
    Ok(result)
}

pub(super) fn probe(conn: &Connection) -> rusqlite::Result<bool> {
    Ok(addable_missing(conn)?.is_empty())
}

pub(super) fn apply(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    let missing = addable_missing(&tx)?;
    for (table, column) in &missing {
        info!("Adding column {}.{}", table.name, column.name);
        tx.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {}",
                table.name,
                column.alter_definition()
            ),
            [],
        )?;
        if let Some(default_value) = column.default_value.filter(|_| !column.has_constant_default()) {
            tx.execute(
                &format!(
                    "UPDATE {} SET \"{}\" = {}",
                    table.name, column.name, default_value
                ),
                [],
            )?;
        }
    }
    tx.commit()?;
    Ok(())
}
