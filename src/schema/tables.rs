//! Base table definitions in their current shape.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, DEFAULT_TIMESTAMP};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
};

const PLAYLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "playlists",
    foreign_column: "id",
};

const TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "id",
};

pub const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("avatar_url", &SqlType::Text),
    ],
};

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("bio", &SqlType::Text),
        sqlite_column!("image_path", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
};

pub const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        // Legacy free-text artist name, superseded by artist_id
        sqlite_column!("artist", &SqlType::Text),
        sqlite_column!("artist_id", &SqlType::Integer, foreign_key = Some(&ARTIST_FK)),
        sqlite_column!("album_art_path", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("uploader_id", &SqlType::Integer, foreign_key = Some(&USER_FK)),
    ],
};

pub const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("title", &SqlType::Text),
        // Legacy free-text artist name, superseded by artist_id
        sqlite_column!("artist", &SqlType::Text),
        sqlite_column!("artist_id", &SqlType::Integer, foreign_key = Some(&ARTIST_FK)),
        // Free-text album label, kept in sync with album_id
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("file_path", &SqlType::Text, non_null = true),
        sqlite_column!("duration", &SqlType::Real),
        sqlite_column!("bitrate", &SqlType::Text),
        sqlite_column!("size", &SqlType::Integer),
        sqlite_column!("is_public", &SqlType::Integer, default_value = Some("0")),
        sqlite_column!("uploader_id", &SqlType::Integer, foreign_key = Some(&USER_FK)),
        sqlite_column!("waveform_data", &SqlType::Text),
        sqlite_column!("album_id", &SqlType::Integer, foreign_key = Some(&ALBUM_FK)),
    ],
};

pub const PLAYLISTS_TABLE: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("creator_id", &SqlType::Integer, foreign_key = Some(&USER_FK)),
        sqlite_column!("is_public", &SqlType::Integer, default_value = Some("0")),
        sqlite_column!("thumbnail_path", &SqlType::Text),
    ],
};

pub const PLAYLIST_TRACKS_TABLE: Table = Table {
    name: "playlist_tracks",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("playlist_id", &SqlType::Integer, foreign_key = Some(&PLAYLIST_FK)),
        sqlite_column!("track_id", &SqlType::Integer, foreign_key = Some(&TRACK_FK)),
        sqlite_column!("order", &SqlType::Integer, default_value = Some("0")),
    ],
};

pub const FAVORITES_TABLE: Table = Table {
    name: "favorites",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            autoincrement = true
        ),
        sqlite_column!("user_id", &SqlType::Integer, foreign_key = Some(&USER_FK)),
        sqlite_column!("track_id", &SqlType::Integer, foreign_key = Some(&TRACK_FK)),
    ],
};

/// Creation order respects references: parents before children.
pub const BASE_TABLES: &[Table] = &[
    USERS_TABLE,
    ARTISTS_TABLE,
    ALBUMS_TABLE,
    TRACKS_TABLE,
    PLAYLISTS_TABLE,
    PLAYLIST_TRACKS_TABLE,
    FAVORITES_TABLE,
];
