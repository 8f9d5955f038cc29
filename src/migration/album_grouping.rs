//! Introduces `tracks.album_id` and backfills it from the legacy free-text
//! `tracks.album` label.

use super::column_or_null;
use crate::sqlite_persistence::has_column;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{info, warn};

pub const UNKNOWN_ALBUM_TITLE: &str = "Unknown Album";
pub const UNKNOWN_ARTIST_NAME: &str = "Unknown Artist";

struct LegacyTrack {
    id: i64,
    album: Option<String>,
    artist: Option<String>,
    uploader_id: Option<i64>,
}

pub(super) fn probe(conn: &Connection) -> rusqlite::Result<bool> {
    has_column(conn, "tracks", "album_id")
}

/// Finds the sentinel album, creating it when absent.
pub(super) fn unknown_album_id(tx: &Transaction<'_>) -> rusqlite::Result<i64> {
    let existing = tx
        .query_row(
            "SELECT id FROM albums WHERE title = ?1 ORDER BY id LIMIT 1",
            params![UNKNOWN_ALBUM_TITLE],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    tx.execute(
        "INSERT INTO albums (title, artist) VALUES (?1, ?2)",
        params![UNKNOWN_ALBUM_TITLE, UNKNOWN_ARTIST_NAME],
    )?;
    Ok(tx.last_insert_rowid())
}

pub(super) fn apply(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;

    // Column add and backfill commit together.
    if !has_column(&tx, "tracks", "album_id")? {
        tx.execute(
            "ALTER TABLE tracks ADD COLUMN album_id INTEGER REFERENCES albums(id)",
            [],
        )?;
    }

    let unknown_album = unknown_album_id(&tx)?;

    let select_sql = format!(
        "SELECT id, {}, {}, {} FROM tracks ORDER BY id",
        column_or_null(&tx, "tracks", "album")?,
        column_or_null(&tx, "tracks", "artist")?,
        column_or_null(&tx, "tracks", "uploader_id")?,
    );
    let tracks = {
        let mut stmt = tx.prepare(&select_sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LegacyTrack {
                    id: row.get(0)?,
                    album: row.get(1)?,
                    artist: row.get(2)?,
                    uploader_id: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let mut created = 0usize;
    {
        let mut find_album =
            tx.prepare("SELECT id FROM albums WHERE title = ?1 ORDER BY id LIMIT 1")?;
        let mut insert_album =
            tx.prepare("INSERT INTO albums (title, artist, uploader_id) VALUES (?1, ?2, ?3)")?;
        let mut update_track =
            tx.prepare("UPDATE tracks SET album_id = ?1, album = ?2 WHERE id = ?3")?;
        let mut find_user = tx.prepare("SELECT 1 FROM users WHERE id = ?1")?;

        for track in &tracks {
            let (album_id, label) = match track.album.as_deref().filter(|a| !a.is_empty()) {
                Some(title) => {
                    let found: Option<i64> = find_album
                        .query_row(params![title], |row| row.get(0))
                        .optional()?;
                    let id = match found {
                        Some(id) => id,
                        None => {
                            let artist = track
                                .artist
                                .as_deref()
                                .filter(|a| !a.is_empty())
                                .unwrap_or(UNKNOWN_ARTIST_NAME);
                            // Old builds never enforced foreign keys, an
                            // uploader may point at a deleted user.
                            let uploader = match track.uploader_id {
                                Some(id) if find_user.exists(params![id])? => Some(id),
                                Some(id) => {
                                    warn!(
                                        "Track {} references missing user {}, album {:?} gets no uploader",
                                        track.id, id, title
                                    );
                                    None
                                }
                                None => None,
                            };
                            insert_album.execute(params![title, artist, uploader])?;
                            created += 1;
                            tx.last_insert_rowid()
                        }
                    };
                    (id, title)
                }
                None => (unknown_album, UNKNOWN_ALBUM_TITLE),
            };
            update_track.execute(params![album_id, label, track.id])?;
        }
    }

    tx.commit()?;
    info!(
        "Grouped {} track(s) into albums, {} album(s) created",
        tracks.len(),
        created
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::schema::ensure_base_schema;

    fn album_of(conn: &Connection, track_id: i64) -> (i64, String, String) {
        conn.query_row(
            "SELECT a.id, a.title, t.album FROM tracks t JOIN albums a ON a.id = t.album_id WHERE t.id = ?1",
            params![track_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap()
    }

    #[test]
    fn test_tracks_with_same_album_name_share_one_album() {
        let mut conn = legacy_connection();
        ensure_base_schema(&conn).unwrap();
        let a = insert_legacy_track(&conn, "A", None, Some("X"), 1, None);
        let b = insert_legacy_track(&conn, "B", None, Some("X"), 1, None);

        assert!(!probe(&conn).unwrap());
        apply(&mut conn).unwrap();
        assert!(probe(&conn).unwrap());

        let (album_a, title_a, _) = album_of(&conn, a);
        let (album_b, _, _) = album_of(&conn, b);
        assert_eq!(album_a, album_b);
        assert_eq!(title_a, "X");
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM albums WHERE title = 'X'"), 1);
    }

    #[test]
    fn test_album_count_is_distinct_names_plus_sentinel() {
        let mut conn = legacy_connection();
        ensure_base_schema(&conn).unwrap();
        let names = [Some("X"), Some("Y"), Some("X"), None, Some("Z"), Some(""), Some("Y")];
        let ids: Vec<i64> = names
            .iter()
            .enumerate()
            .map(|(i, album)| insert_legacy_track(&conn, &format!("t{}", i), None, *album, 1, None))
            .collect();

        apply(&mut conn).unwrap();

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM albums"), 3 + 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM tracks"), names.len() as i64);
        for (id, album) in ids.iter().zip(names.iter()) {
            let (_, title, label) = album_of(&conn, *id);
            let expected = album.filter(|a| !a.is_empty()).unwrap_or(UNKNOWN_ALBUM_TITLE);
            assert_eq!(title, expected);
            assert_eq!(label, expected);
        }
    }

    #[test]
    fn test_new_album_is_attributed_to_uploader_and_artist() {
        let mut conn = legacy_connection();
        ensure_base_schema(&conn).unwrap();
        let track = insert_legacy_track(&conn, "A", Some("Band"), Some("X"), 2, None);
        apply(&mut conn).unwrap();

        let (album_id, _, _) = album_of(&conn, track);
        let (uploader, artist): (i64, String) = conn
            .query_row(
                "SELECT uploader_id, artist FROM albums WHERE id = ?1",
                params![album_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(uploader, 2);
        assert_eq!(artist, "Band");
    }

    #[test]
    fn test_missing_uploader_leaves_album_unattributed() {
        let mut conn = legacy_connection();
        let track = insert_legacy_track(&conn, "A", Some("Band"), Some("X"), 1, None);
        conn.execute("DELETE FROM users WHERE id = 1", []).unwrap();
        ensure_base_schema(&conn).unwrap();

        apply(&mut conn).unwrap();

        let (album_id, title, _) = album_of(&conn, track);
        assert_eq!(title, "X");
        let uploader: Option<i64> = conn
            .query_row(
                "SELECT uploader_id FROM albums WHERE id = ?1",
                params![album_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(uploader, None);
        // The track keeps its original reference
        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM tracks WHERE uploader_id = 1"),
            1
        );
    }

    #[test]
    fn test_reuses_existing_sentinel() {
        let mut conn = legacy_connection();
        ensure_base_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO albums (title, artist) VALUES ('Unknown Album', 'Unknown Artist')",
            [],
        )
        .unwrap();
        insert_legacy_track(&conn, "A", None, None, 1, None);
        apply(&mut conn).unwrap();

        assert_eq!(
            count(&conn, "SELECT COUNT(*) FROM albums WHERE title = 'Unknown Album'"),
            1
        );
    }

    #[test]
    fn test_failure_leaves_pre_migration_state() {
        let mut conn = legacy_connection();
        ensure_base_schema(&conn).unwrap();
        insert_legacy_track(&conn, "A", None, Some("X"), 1, None);
        // Album inserts fail halfway through the backfill
        conn.execute_batch(
            "CREATE TRIGGER reject_albums BEFORE INSERT ON albums WHEN NEW.title = 'X'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        assert!(apply(&mut conn).is_err());
        assert!(!probe(&conn).unwrap());
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM albums"), 0);
    }
}
