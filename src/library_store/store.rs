//! SQLite-backed library store implementation.

use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::{LibraryStats, LibraryStore};
use crate::library::{AugmentedLibraryTrack, LibraryTrack};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite-backed library store.
///
/// Holds separate read and write connections in WAL mode; both are mutex
/// guarded so the store can be shared across the import chunk's concurrent
/// tasks.
#[derive(Clone)]
pub struct SqliteLibraryStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = LIBRARY_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &LIBRARY_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating library db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let mut current_version = if db_version < BASE_DB_VERSION as i64 {
        0
    } else {
        (db_version - BASE_DB_VERSION as i64) as usize
    };

    if current_version >= latest_version {
        latest_schema.validate(conn)?;
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in LIBRARY_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating library db from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
            current_version = schema.version;
        }
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(())
}

impl SqliteLibraryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open library database")?;

        migrate_if_needed(&mut write_conn)?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on library write connection")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open library database for reading")?;

        read_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on library read connection")?;

        let stats = Self::count_rows(&read_conn)?;
        info!(
            "Library store ready: {} tracks, {} augmented",
            stats.total_tracks, stats.augmented_tracks
        );

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }

    fn count_rows(conn: &Connection) -> Result<LibraryStats> {
        let total_tracks: usize = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        let augmented_tracks: usize = conn.query_row(
            "SELECT COUNT(*) FROM tracks WHERE augmented_at IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(LibraryStats {
            total_tracks,
            augmented_tracks,
        })
    }
}

const TRACK_COLUMNS: &str = "platform_track_id, title, artist, album, genre, year, total_time, \
     location, themes, keywords, mood, bpm, tempo, style, augmented_at";

fn row_to_track(row: &Row<'_>) -> rusqlite::Result<AugmentedLibraryTrack> {
    Ok(AugmentedLibraryTrack {
        track: LibraryTrack {
            platform_track_id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            album: row.get(3)?,
            genre: row.get(4)?,
            year: row.get(5)?,
            total_time: row.get(6)?,
            location: row.get(7)?,
        },
        themes: row.get(8)?,
        keywords: row.get(9)?,
        mood: row.get(10)?,
        bpm: row.get(11)?,
        tempo: row.get(12)?,
        style: row.get(13)?,
        augmented_at: row.get(14)?,
    })
}

impl LibraryStore for SqliteLibraryStore {
    fn exists(&self, platform_track_id: &str) -> Result<bool> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT 1 FROM tracks WHERE platform_track_id = ?1")?;
        let found = stmt
            .query_row(params![platform_track_id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(found)
    }

    fn store(&self, track: &AugmentedLibraryTrack) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO tracks ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                TRACK_COLUMNS
            ),
            params![
                track.track.platform_track_id,
                track.track.title,
                track.track.artist,
                track.track.album,
                track.track.genre,
                track.track.year,
                track.track.total_time,
                track.track.location,
                track.themes,
                track.keywords,
                track.mood,
                track.bpm,
                track.tempo,
                track.style,
                track.augmented_at,
            ],
        )
        .with_context(|| {
            format!(
                "Failed to store track {}",
                track.track.platform_track_id
            )
        })?;
        Ok(())
    }

    fn get_by_platform_id(&self, platform_track_id: &str) -> Result<Option<AugmentedLibraryTrack>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM tracks WHERE platform_track_id = ?1",
            TRACK_COLUMNS
        ))?;
        let result = stmt
            .query_row(params![platform_track_id], row_to_track)
            .optional()?;
        Ok(result)
    }

    fn get_all(&self) -> Result<Vec<AugmentedLibraryTrack>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM tracks ORDER BY platform_track_id",
            TRACK_COLUMNS
        ))?;
        let tracks = stmt
            .query_map([], row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn get_stats(&self) -> Result<LibraryStats> {
        let conn = self.read_conn.lock().unwrap();
        Self::count_rows(&conn)
    }
}
