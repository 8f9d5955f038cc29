//! Introduces `artist_id` on tracks and albums, backfilled from the legacy
//! free-text `artist` columns.

use super::album_grouping::UNKNOWN_ARTIST_NAME;
use crate::sqlite_persistence::has_column;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeSet;
use tracing::info;

pub(super) fn probe(conn: &Connection) -> rusqlite::Result<bool> {
    has_column(conn, "tracks", "artist_id")
}

fn unknown_artist_id(tx: &Transaction<'_>) -> rusqlite::Result<i64> {
    let existing = tx
        .query_row(
            "SELECT id FROM artists WHERE name = ?1",
            params![UNKNOWN_ARTIST_NAME],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    tx.execute(
        "INSERT INTO artists (name) VALUES (?1)",
        params![UNKNOWN_ARTIST_NAME],
    )?;
    Ok(tx.last_insert_rowid())
}

fn distinct_artist_names(
    tx: &Transaction<'_>,
    table: &str,
    names: &mut BTreeSet<String>,
) -> rusqlite::Result<()> {
    if !has_column(tx, table, "artist")? {
        return Ok(());
    }
    let mut stmt = tx.prepare(&format!(
        "SELECT DISTINCT artist FROM {} WHERE artist IS NOT NULL AND artist != ''",
        table
    ))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for name in rows {
        names.insert(name?);
    }
    Ok(())
}

/// Points `table.artist_id` at the artist named by the legacy column, and
/// everything left over at the unknown artist.
fn link_artists(tx: &Transaction<'_>, table: &str, unknown_artist: i64) -> rusqlite::Result<()> {
    if has_column(tx, table, "artist")? {
        tx.execute(
            &format!(
                "UPDATE {table} SET artist_id = (SELECT id FROM artists WHERE name = {table}.artist)
                 WHERE artist IS NOT NULL AND artist != '' AND artist_id IS NULL"
            ),
            [],
        )?;
    }
    tx.execute(
        &format!("UPDATE {} SET artist_id = ?1 WHERE artist_id IS NULL", table),
        params![unknown_artist],
    )?;
    Ok(())
}

pub(super) fn apply(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;

    for table in ["tracks", "albums"] {
        if !has_column(&tx, table, "artist_id")? {
            tx.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN artist_id INTEGER REFERENCES artists(id)",
                    table
                ),
                [],
            )?;
        }
    }

    let unknown_artist = unknown_artist_id(&tx)?;

    let mut names = BTreeSet::new();
    distinct_artist_names(&tx, "tracks", &mut names)?;
    distinct_artist_names(&tx, "albums", &mut names)?;
    {
        let mut insert_artist = tx.prepare("INSERT OR IGNORE INTO artists (name) VALUES (?1)")?;
        for name in &names {
            insert_artist.execute(params![name])?;
        }
    }

    link_artists(&tx, "tracks", unknown_artist)?;
    link_artists(&tx, "albums", unknown_artist)?;

    tx.commit()?;
    info!("Linked tracks and albums to {} artist name(s)", names.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::migration::album_grouping;
    use crate::schema::ensure_base_schema;

    fn artist_of_track(conn: &Connection, track_id: i64) -> String {
        conn.query_row(
            "SELECT a.name FROM tracks t JOIN artists a ON a.id = t.artist_id WHERE t.id = ?1",
            params![track_id],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_links_tracks_and_albums_to_artists() {
        let mut conn = legacy_connection();
        ensure_base_schema(&conn).unwrap();
        let a = insert_legacy_track(&conn, "A", Some("Band"), Some("X"), 1, None);
        let b = insert_legacy_track(&conn, "B", Some("Band"), None, 1, None);
        let c = insert_legacy_track(&conn, "C", None, None, 2, None);
        let d = insert_legacy_track(&conn, "D", Some("Solo"), Some("Y"), 2, None);
        album_grouping::apply(&mut conn).unwrap();

        // Base schema already gave albums an artist_id column; tracks lack it
        assert!(!probe(&conn).unwrap());
        apply(&mut conn).unwrap();
        assert!(probe(&conn).unwrap());

        assert_eq!(artist_of_track(&conn, a), "Band");
        assert_eq!(artist_of_track(&conn, b), "Band");
        assert_eq!(artist_of_track(&conn, c), UNKNOWN_ARTIST_NAME);
        assert_eq!(artist_of_track(&conn, d), "Solo");

        // Band, Solo, Unknown Artist
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM artists"), 3);
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM albums WHERE artist_id IS NULL"),
            0
        );
        let sentinel_artist: String = conn
            .query_row(
                "SELECT ar.name FROM albums al JOIN artists ar ON ar.id = al.artist_id WHERE al.title = 'Unknown Album'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(sentinel_artist, UNKNOWN_ARTIST_NAME);
    }

    #[test]
    fn test_existing_artists_are_reused() {
        let mut conn = legacy_connection();
        ensure_base_schema(&conn).unwrap();
        conn.execute("INSERT INTO artists (name) VALUES ('Band')", [])
            .unwrap();
        insert_legacy_track(&conn, "A", Some("Band"), None, 1, None);
        album_grouping::apply(&mut conn).unwrap();
        apply(&mut conn).unwrap();

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM artists WHERE name = 'Band'"), 1);
    }
}
