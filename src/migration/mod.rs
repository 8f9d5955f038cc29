//! Schema migrations without a version table.
//!
//! Each step probes the live catalog for the shape it produces. A step whose
//! probe reports the shape as present is skipped, so running the whole list
//! again after a partial or complete run is always safe. Steps that rewrite
//! rows do so inside one transaction; a failure rolls back that step only,
//! earlier steps stay committed.

mod album_grouping;
mod artist_references;
mod artwork;
mod optional_columns;
mod reference_indices;

use crate::error::{StoreError, StoreResult};
use crate::schema::BASE_TABLES;
use rusqlite::Connection;
use std::time::Instant;
use tracing::{debug, error, info};

pub use album_grouping::{UNKNOWN_ALBUM_TITLE, UNKNOWN_ARTIST_NAME};
pub use reference_indices::REFERENCE_INDICES;

/// One self-detecting schema transformation.
pub struct MigrationStep {
    pub name: &'static str,
    /// `Ok(true)` when the target shape is already present.
    pub probe: fn(&Connection) -> rusqlite::Result<bool>,
    pub apply: fn(&mut Connection) -> rusqlite::Result<()>,
}

/// Applied in declaration order.
pub const MIGRATION_STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "introduce_album_grouping",
        probe: album_grouping::probe,
        apply: album_grouping::apply,
    },
    MigrationStep {
        name: "rename_album_cover_art",
        probe: artwork::probe_album_art_column,
        apply: artwork::rename_album_art_column,
    },
    MigrationStep {
        name: "move_track_art_to_albums",
        probe: artwork::probe_track_art_removed,
        apply: artwork::move_track_art_to_albums,
    },
    MigrationStep {
        name: "introduce_artist_references",
        probe: artist_references::probe,
        apply: artist_references::apply,
    },
    MigrationStep {
        name: "add_optional_columns",
        probe: optional_columns::probe,
        apply: optional_columns::apply,
    },
    MigrationStep {
        name: "create_reference_indices",
        probe: reference_indices::probe,
        apply: reference_indices::apply,
    },
];

/// What a migration run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Brings the schema to the current shape and checks the result.
pub fn run_migrations(conn: &mut Connection) -> StoreResult<MigrationReport> {
    let report = run_steps(conn, MIGRATION_STEPS)?;
    verify_shape(conn)?;
    if report.is_noop() {
        info!("Schema is up to date");
    } else {
        info!("Applied {} migration step(s): {:?}", report.applied.len(), report.applied);
    }
    Ok(report)
}

pub fn run_steps(conn: &mut Connection, steps: &[MigrationStep]) -> StoreResult<MigrationReport> {
    let mut report = MigrationReport::default();
    for step in steps {
        let already_applied = (step.probe)(conn).map_err(|source| {
            // Introspection failed: the catalog could not be read at all,
            // which is not the same as the shape being absent.
            error!("Probe for migration step {} failed: {:?}", step.name, source);
            StoreError::Migration {
                step: step.name,
                source,
            }
        })?;

        if already_applied {
            debug!("Migration step {} already applied", step.name);
            report.skipped.push(step.name);
            continue;
        }

        info!("Running migration step {}...", step.name);
        let start = Instant::now();
        (step.apply)(conn).map_err(|source| {
            error!("Migration step {} failed: {:?}", step.name, source);
            StoreError::Migration {
                step: step.name,
                source,
            }
        })?;
        info!(
            "Migration step {} done in {:?}",
            step.name,
            start.elapsed()
        );
        report.applied.push(step.name);
    }
    Ok(report)
}

/// Every base table must contain at least the columns this build declares.
pub fn verify_shape(conn: &Connection) -> StoreResult<()> {
    for table in BASE_TABLES {
        let missing = table
            .missing_columns(conn)
            .map_err(|source| StoreError::Migration {
                step: "verify_shape",
                source,
            })?;
        if let Some(&column) = missing.first() {
            return Err(StoreError::SchemaShape {
                table: table.name,
                column,
            });
        }
    }
    Ok(())
}

/// `SELECT` expression for `column`, or `NULL` when the table lacks it.
pub(crate) fn column_or_null(
    conn: &Connection,
    table: &str,
    column: &'static str,
) -> rusqlite::Result<&'static str> {
    if crate::sqlite_persistence::has_column(conn, table, column)? {
        Ok(column)
    } else {
        Ok("NULL")
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::schema::ensure_base_schema;
    use crate::sqlite_persistence::column_names;

    fn migrate(conn: &mut Connection) -> MigrationReport {
        ensure_base_schema(conn).unwrap();
        run_migrations(conn).unwrap()
    }

    fn dump(conn: &Connection) -> Vec<String> {
        let mut out = Vec::new();
        for table in BASE_TABLES {
            out.push(format!("{}: {:?}", table.name, column_names(conn, table.name).unwrap()));
            let mut stmt = conn
                .prepare(&format!("SELECT * FROM {} ORDER BY id", table.name))
                .unwrap();
            let width = stmt.column_count();
            let rows = stmt
                .query_map([], |row| {
                    (0..width)
                        .map(|i| row.get::<_, rusqlite::types::Value>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })
                .unwrap()
                .collect::<rusqlite::Result<Vec<_>>>()
                .unwrap();
            out.push(format!("{:?}", rows));
        }
        out
    }

    #[test]
    fn test_fresh_database_only_needs_indices() {
        let mut conn = Connection::open_in_memory().unwrap();
        let report = migrate(&mut conn);
        assert_eq!(report.applied, vec!["create_reference_indices"]);

        let report = migrate(&mut conn);
        assert!(report.is_noop());
        assert_eq!(report.skipped.len(), MIGRATION_STEPS.len());
    }

    #[test]
    fn test_legacy_database_is_fully_migrated() {
        let mut conn = legacy_connection();
        insert_legacy_track(&conn, "A", Some("Band"), Some("X"), 1, Some("art/x.jpg"));
        insert_legacy_track(&conn, "B", Some("Band"), Some("X"), 1, None);
        insert_legacy_track(&conn, "C", None, None, 2, None);

        let report = migrate(&mut conn);
        assert_eq!(report.applied.len(), MIGRATION_STEPS.len() - 1);
        assert!(report.skipped.contains(&"rename_album_cover_art"));
        verify_shape(&conn).unwrap();
        assert!(!column_names(&conn, "tracks")
            .unwrap()
            .contains(&"album_art_path".to_string()));
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut conn = legacy_connection();
        insert_legacy_track(&conn, "A", Some("Band"), Some("X"), 1, Some("art/x.jpg"));
        insert_legacy_track(&conn, "B", None, Some("Y"), 2, None);
        insert_legacy_track(&conn, "C", None, None, 2, None);

        migrate(&mut conn);
        let after_first = dump(&conn);
        let report = migrate(&mut conn);
        let after_second = dump(&conn);

        assert!(report.is_noop());
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_failing_step_stops_the_run() {
        fn never_applied(_: &Connection) -> rusqlite::Result<bool> {
            Ok(false)
        }
        fn broken(conn: &mut Connection) -> rusqlite::Result<()> {
            conn.execute("ALTER TABLE no_such_table ADD COLUMN x INTEGER", [])?;
            Ok(())
        }
        fn must_not_run(_: &mut Connection) -> rusqlite::Result<()> {
            panic!("step after a failure must not run");
        }

        let steps = [
            MigrationStep {
                name: "broken",
                probe: never_applied,
                apply: broken,
            },
            MigrationStep {
                name: "later",
                probe: never_applied,
                apply: must_not_run,
            },
        ];
        let mut conn = Connection::open_in_memory().unwrap();
        let err = run_steps(&mut conn, &steps).unwrap_err();
        assert!(matches!(err, StoreError::Migration { step: "broken", .. }));
    }

    #[test]
    fn test_unreadable_catalog_stops_the_run_before_apply() {
        fn unreadable(conn: &Connection) -> rusqlite::Result<bool> {
            conn.query_row("SELECT shape FROM no_such_catalog", [], |_| Ok(true))
        }
        fn must_not_run(_: &mut Connection) -> rusqlite::Result<()> {
            panic!("apply must not run when the probe failed");
        }
        fn never_applied(_: &Connection) -> rusqlite::Result<bool> {
            Ok(false)
        }

        let steps = [
            MigrationStep {
                name: "unreadable",
                probe: unreadable,
                apply: must_not_run,
            },
            MigrationStep {
                name: "later",
                probe: never_applied,
                apply: must_not_run,
            },
        ];
        let mut conn = Connection::open_in_memory().unwrap();
        let err = run_steps(&mut conn, &steps).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Migration {
                step: "unreadable",
                ..
            }
        ));
    }

    #[test]
    fn test_verify_shape_reports_missing_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT)", [])
            .unwrap();
        ensure_base_schema(&conn).unwrap();
        let err = verify_shape(&conn).unwrap_err();
        assert!(matches!(
            err,
            StoreError::SchemaShape {
                table: "users",
                column: "name"
            }
        ));
    }
}
