//! End-to-end tests for the import pipeline.
//!
//! Drives the real importer and the real SQLite store with a fake augmenter,
//! exercising the skip/fallback/store contract across process boundaries.

use async_trait::async_trait;
use mixtape::augment::{AugmentError, TrackAugmenter};
use mixtape::import::LibraryImporter;
use mixtape::library::{AugmentedLibraryTrack, LibraryTrack};
use mixtape::library_store::{LibraryStore, SqliteLibraryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct ScriptedAugmenter {
    calls: AtomicUsize,
    /// Titles whose augmentation should fail with a resolution miss.
    fail_titles: Vec<String>,
}

impl ScriptedAugmenter {
    fn new(fail_titles: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_titles: fail_titles.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl TrackAugmenter for ScriptedAugmenter {
    async fn augment(&self, track: &LibraryTrack) -> Result<AugmentedLibraryTrack, AugmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_titles.contains(&track.title) {
            return Err(AugmentError::ResolutionMiss {
                title: track.title.clone(),
                artist: track.artist.clone(),
            });
        }
        Ok(AugmentedLibraryTrack {
            track: track.clone(),
            themes: Some("nostalgia".to_string()),
            keywords: Some("summer, road".to_string()),
            mood: Some("wistful".to_string()),
            bpm: Some(96.0),
            tempo: Some("moderate".to_string()),
            style: Some("indie pop".to_string()),
            augmented_at: Some(1700000000),
        })
    }
}

fn make_track(id: &str, title: &str) -> LibraryTrack {
    LibraryTrack {
        platform_track_id: id.to_string(),
        title: title.to_string(),
        artist: "Some Artist".to_string(),
        album: "Some Album".to_string(),
        genre: Some("Rock".to_string()),
        year: Some(2001),
        total_time: Some(180),
        location: format!("/music/{}.mp3", id),
    }
}

fn make_store() -> (Arc<SqliteLibraryStore>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let store = SqliteLibraryStore::new(tmp.path().join("library.db")).unwrap();
    (Arc::new(store), tmp)
}

#[tokio::test]
async fn test_import_stores_augmented_records() {
    let (store, _tmp) = make_store();
    let augmenter = Arc::new(ScriptedAugmenter::new(&[]));
    let importer = LibraryImporter::new(store.clone(), augmenter, 50);

    let tracks = vec![make_track("t1", "First"), make_track("t2", "Second")];
    let report = importer.run(&tracks).await;

    assert_eq!(report.augmented, 2);
    assert_eq!(report.fallback, 0);

    let stored = store.get_by_platform_id("t1").unwrap().unwrap();
    assert!(stored.is_augmented());
    assert_eq!(stored.tempo.as_deref(), Some("moderate"));
}

#[tokio::test]
async fn test_failed_augmentation_keeps_track_with_null_attributes() {
    let (store, _tmp) = make_store();
    let augmenter = Arc::new(ScriptedAugmenter::new(&["Unmatchable"]));
    let importer = LibraryImporter::new(store.clone(), augmenter, 50);

    let tracks = vec![
        make_track("t1", "Matchable"),
        make_track("t2", "Unmatchable"),
    ];
    let report = importer.run(&tracks).await;

    assert_eq!(report.augmented, 1);
    assert_eq!(report.fallback, 1);

    // The failed track is stored, with its base fields intact and every
    // augmentation column null.
    let fallback = store.get_by_platform_id("t2").unwrap().unwrap();
    assert_eq!(fallback.track.title, "Unmatchable");
    assert_eq!(fallback.track.genre.as_deref(), Some("Rock"));
    assert!(fallback.themes.is_none());
    assert!(fallback.keywords.is_none());
    assert!(fallback.mood.is_none());
    assert!(fallback.bpm.is_none());
    assert!(fallback.tempo.is_none());
    assert!(fallback.style.is_none());
    assert!(!fallback.is_augmented());
}

#[tokio::test]
async fn test_rerun_skips_existing_rows_and_calls_nothing() {
    let (store, _tmp) = make_store();
    let tracks = vec![make_track("t1", "First"), make_track("t2", "Second")];

    let first_augmenter = Arc::new(ScriptedAugmenter::new(&[]));
    LibraryImporter::new(store.clone(), first_augmenter, 50)
        .run(&tracks)
        .await;

    let second_augmenter = Arc::new(ScriptedAugmenter::new(&[]));
    let report = LibraryImporter::new(store.clone(), second_augmenter.clone(), 50)
        .run(&tracks)
        .await;

    // Idempotent re-run: zero augmentation calls, zero additional rows.
    assert_eq!(second_augmenter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(store.get_stats().unwrap().total_tracks, 2);
}

#[tokio::test]
async fn test_partial_run_is_resumable() {
    let (store, _tmp) = make_store();
    let tracks = vec![
        make_track("t1", "First"),
        make_track("t2", "Second"),
        make_track("t3", "Third"),
    ];

    // Simulate an interrupted earlier run that only got through t1.
    LibraryImporter::new(store.clone(), Arc::new(ScriptedAugmenter::new(&[])), 50)
        .run(&tracks[..1])
        .await;

    let augmenter = Arc::new(ScriptedAugmenter::new(&[]));
    let report = LibraryImporter::new(store.clone(), augmenter.clone(), 50)
        .run(&tracks)
        .await;

    assert_eq!(augmenter.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.augmented, 2);
    assert_eq!(store.get_stats().unwrap().total_tracks, 3);
}

#[tokio::test]
async fn test_chunked_import_covers_whole_library() {
    let (store, _tmp) = make_store();
    let tracks: Vec<LibraryTrack> = (0..23)
        .map(|i| make_track(&format!("t{}", i), &format!("Track {}", i)))
        .collect();

    let augmenter = Arc::new(ScriptedAugmenter::new(&[]));
    let report = LibraryImporter::new(store.clone(), augmenter, 5)
        .run(&tracks)
        .await;

    assert_eq!(report.total, 23);
    assert_eq!(report.augmented, 23);
    assert_eq!(store.get_stats().unwrap().total_tracks, 23);
}
