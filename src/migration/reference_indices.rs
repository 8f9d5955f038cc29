use crate::sqlite_persistence::index_exists;
use rusqlite::Connection;

/// (index, table, column). Created after migrations because some of these
/// columns only exist once earlier steps ran.
pub const REFERENCE_INDICES: &[(&str, &str, &str)] = &[
    ("idx_tracks_album_id", "tracks", "album_id"),
    ("idx_tracks_artist_id", "tracks", "artist_id"),
    ("idx_tracks_uploader_id", "tracks", "uploader_id"),
    ("idx_albums_artist_id", "albums", "artist_id"),
    ("idx_playlist_tracks_playlist_id", "playlist_tracks", "playlist_id"),
    ("idx_favorites_user_id", "favorites", "user_id"),
];

pub(super) fn probe(conn: &Connection) -> rusqlite::Result<bool> {
    for (index, _, _) in REFERENCE_INDICES {
        if !index_exists(conn, index)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(super) fn apply(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for (index, table, column) in REFERENCE_INDICES {
        tx.execute(
            &format!("CREATE INDEX IF NOT EXISTS {} ON {}({})", index, table, column),
            [],
        )?;
    }
    tx.commit()
}
