use rusqlite::{params, Connection};
use rythm_store::{Database, Store, StoreOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Temporary directory holding one database image.
pub struct TestDir {
    _dir: TempDir,
    pub image_path: PathBuf,
}

impl TestDir {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("library.db");
        TestDir {
            _dir: dir,
            image_path,
        }
    }
}

pub fn store_options(image_path: &Path, snapshot_interval: Option<Duration>) -> StoreOptions {
    StoreOptions {
        image_path: image_path.to_path_buf(),
        snapshot_interval,
    }
}

/// Store without the snapshot timer.
pub fn open_store(image_path: &Path) -> Store {
    Store::initialize(&store_options(image_path, None)).unwrap()
}

pub struct LegacyTrack {
    pub title: &'static str,
    pub artist: Option<&'static str>,
    pub album: Option<&'static str>,
    pub uploader_id: i64,
    pub art: Option<&'static str>,
}

pub fn legacy_track(
    title: &'static str,
    artist: Option<&'static str>,
    album: Option<&'static str>,
    uploader_id: i64,
    art: Option<&'static str>,
) -> LegacyTrack {
    LegacyTrack {
        title,
        artist,
        album,
        uploader_id,
        art,
    }
}

/// Writes an image whose schema predates albums and artists: tracks carry a
/// free-text album and their own artwork.
pub fn write_legacy_image(image_path: &Path, tracks: &[LegacyTrack]) {
    let conn = Connection::open(image_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE, name TEXT, avatar_url TEXT);
         CREATE TABLE tracks (
            id INTEGER PRIMARY KEY,
            title TEXT,
            artist TEXT,
            album TEXT,
            genre TEXT,
            file_path TEXT,
            duration REAL,
            bitrate TEXT,
            size INTEGER,
            is_public BOOLEAN,
            uploader_id INTEGER REFERENCES users(id),
            waveform_data JSON,
            album_art_path TEXT
         );
         CREATE TABLE playlists (id INTEGER PRIMARY KEY, name TEXT, creator_id INTEGER, is_public BOOLEAN);
         CREATE TABLE playlist_tracks (id INTEGER PRIMARY KEY, playlist_id INTEGER, track_id INTEGER, \"order\" INTEGER);
         CREATE TABLE favorites (id INTEGER PRIMARY KEY, user_id INTEGER, track_id INTEGER);
         INSERT INTO users (id, email, name) VALUES (1, 'one@example.com', 'One'), (2, 'two@example.com', 'Two');
         INSERT INTO playlists (id, name, creator_id, is_public) VALUES (1, 'Mix', 1, 1);",
    )
    .unwrap();
    for track in tracks {
        conn.execute(
            "INSERT INTO tracks (title, artist, album, file_path, duration, uploader_id, album_art_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                track.title,
                track.artist,
                track.album,
                format!("uploads/{}.mp3", track.title),
                180.5,
                track.uploader_id,
                track.art
            ],
        )
        .unwrap();
        let track_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO playlist_tracks (playlist_id, track_id, \"order\") VALUES (1, ?1, ?1)",
            params![track_id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO favorites (user_id, track_id) VALUES (?1, ?2)",
            params![track.uploader_id, track_id],
        )
        .unwrap();
    }
}

pub fn count(db: &Database, sql: &str) -> i64 {
    let row = db.get(sql, []).unwrap().unwrap();
    match row.values().first() {
        Some(rusqlite::types::Value::Integer(n)) => *n,
        other => panic!("expected a count, got {:?}", other),
    }
}
