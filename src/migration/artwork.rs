//! Album artwork lives on `albums.album_art_path` only.

use crate::sqlite_persistence::has_column;
use rusqlite::{params, Connection};
use tracing::{info, warn};

pub(super) fn probe_album_art_column(conn: &Connection) -> rusqlite::Result<bool> {
    Ok(!has_column(conn, "albums", "cover_art_path")?)
}

/// Renames `albums.cover_art_path` to `album_art_path`. If both columns exist
/// the old values fill the gaps in the new column and the old column is dropped.
pub(super) fn rename_album_art_column(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    if has_column(&tx, "albums", "album_art_path")? {
        let merged = tx.execute(
            "UPDATE albums SET album_art_path = cover_art_path
             WHERE (album_art_path IS NULL OR album_art_path = '') AND cover_art_path IS NOT NULL",
            [],
        )?;
        tx.commit()?;
        info!("Merged {} cover_art_path value(s) into album_art_path", merged);
        drop_column_or_keep(conn, "albums", "cover_art_path");
    } else {
        tx.execute(
            "ALTER TABLE albums RENAME COLUMN cover_art_path TO album_art_path",
            [],
        )?;
        tx.commit()?;
    }
    Ok(())
}

pub(super) fn probe_track_art_removed(conn: &Connection) -> rusqlite::Result<bool> {
    Ok(!has_column(conn, "tracks", "album_art_path")?)
}

/// Copies track artwork up to the parent album (first track wins, existing
/// album artwork is never overwritten) and then drops the track column.
pub(super) fn move_track_art_to_albums(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    let with_art: Vec<(i64, String)> = {
        let mut stmt = tx.prepare(
            "SELECT album_id, album_art_path FROM tracks
             WHERE album_art_path IS NOT NULL AND album_art_path != '' AND album_id IS NOT NULL
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let mut copied = 0usize;
    {
        let mut update_album = tx.prepare(
            "UPDATE albums SET album_art_path = ?1
             WHERE id = ?2 AND (album_art_path IS NULL OR album_art_path = '')",
        )?;
        for (album_id, art) in &with_art {
            copied += update_album.execute(params![art, album_id])?;
        }
    }
    tx.commit()?;
    info!("Copied artwork to {} album(s)", copied);

    drop_column_or_keep(conn, "tracks", "album_art_path");
    Ok(())
}

/// Drops a column the engine may not be able to drop. On failure the column
/// stays as an unused orphan.
fn drop_column_or_keep(conn: &Connection, table: &str, column: &str) {
    match conn.execute(&format!("ALTER TABLE {} DROP COLUMN {}", table, column), []) {
        Ok(_) => info!("Dropped column {}.{}", table, column),
        Err(e) => warn!(
            "Could not drop column {}.{}, leaving it in place: {}",
            table, column, e
        ),
    }
}
