//! SQLite schema definitions for the library database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// One row per imported track; augmentation columns are nullable because a
/// track whose enrichment failed is stored with base fields only.
const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("platform_track_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("total_time", &SqlType::Integer),
        sqlite_column!("location", &SqlType::Text, non_null = true),
        // Augmentation
        sqlite_column!("themes", &SqlType::Text),
        sqlite_column!("keywords", &SqlType::Text),
        sqlite_column!("mood", &SqlType::Text),
        sqlite_column!("bpm", &SqlType::Real),
        sqlite_column!("tempo", &SqlType::Text),
        sqlite_column!("style", &SqlType::Text),
        sqlite_column!("augmented_at", &SqlType::Integer),
    ],
    indices: &[("idx_tracks_artist", "artist")],
};

pub const LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[TRACKS_TABLE],
    migration: None,
}];
