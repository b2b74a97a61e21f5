//! Library import orchestration.
//!
//! Processes a library snapshot in fixed-size chunks: chunks run one after
//! another, tracks within a chunk run concurrently, and the whole chunk is
//! joined before the next one starts. That caps the number of outstanding
//! external calls at the chunk size without any further bookkeeping.
//!
//! Failure handling contract: augmentation failure degrades data quality,
//! never availability. A track whose enrichment fails in any recoverable way
//! is stored as its unaugmented base record; only a storage write failure
//! loses a track, and even that never stops the batch.

use crate::augment::{AugmentError, TrackAugmenter};
use crate::library::{AugmentedLibraryTrack, LibraryTrack};
use crate::library_store::LibraryStore;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Outcome of one track's import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Already in storage, nothing done.
    Skipped,
    /// Augmented and stored.
    Augmented,
    /// Augmentation failed, base record stored.
    Fallback,
    /// Storage write failed, track not persisted.
    Failed,
}

/// Per-run tally, one increment per track.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub total: usize,
    pub skipped: usize,
    pub augmented: usize,
    pub fallback: usize,
    pub failed: usize,
}

impl ImportReport {
    fn record(&mut self, outcome: TrackOutcome) {
        match outcome {
            TrackOutcome::Skipped => self.skipped += 1,
            TrackOutcome::Augmented => self.augmented += 1,
            TrackOutcome::Fallback => self.fallback += 1,
            TrackOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct LibraryImporter {
    store: Arc<dyn LibraryStore>,
    augmenter: Arc<dyn TrackAugmenter>,
    chunk_size: usize,
}

impl LibraryImporter {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        augmenter: Arc<dyn TrackAugmenter>,
        chunk_size: usize,
    ) -> Self {
        Self {
            store,
            augmenter,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Run the import over a full snapshot. Never fails as a whole: per-track
    /// errors are absorbed into the report.
    pub async fn run(&self, tracks: &[LibraryTrack]) -> ImportReport {
        let total = tracks.len();
        let mut report = ImportReport {
            total,
            ..Default::default()
        };

        for (chunk_index, chunk) in tracks.chunks(self.chunk_size).enumerate() {
            let base = chunk_index * self.chunk_size;
            let outcomes = join_all(
                chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, track)| self.process_track(track, base + offset + 1, total)),
            )
            .await;

            for outcome in outcomes {
                report.record(outcome);
            }
        }

        info!(
            "Import complete: {} tracks, {} augmented, {} fallback, {} skipped, {} failed",
            report.total, report.augmented, report.fallback, report.skipped, report.failed
        );
        report
    }

    async fn process_track(&self, track: &LibraryTrack, index: usize, total: usize) -> TrackOutcome {
        let id = &track.platform_track_id;

        match self.store.exists(id) {
            Ok(true) => {
                info!(
                    "{}/{} Skipping {} by {}: already exists",
                    index, total, track.title, track.artist
                );
                return TrackOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                error!(
                    "{}/{} Existence check failed for {} by {}: {}",
                    index, total, track.title, track.artist, e
                );
                return TrackOutcome::Failed;
            }
        }

        info!(
            "{}/{} Augmenting {} by {}...",
            index, total, track.title, track.artist
        );

        let (record, outcome) = match self.augmenter.augment(track).await {
            Ok(augmented) => (augmented, TrackOutcome::Augmented),
            Err(e) => {
                log_augment_failure(track, index, total, &e);
                (
                    AugmentedLibraryTrack::unaugmented(track.clone()),
                    TrackOutcome::Fallback,
                )
            }
        };

        if let Err(e) = self.store.store(&record) {
            error!(
                "{}/{} Failed to store {} by {}: {}",
                index, total, track.title, track.artist, e
            );
            return TrackOutcome::Failed;
        }
        outcome
    }
}

fn log_augment_failure(track: &LibraryTrack, index: usize, total: usize, error: &AugmentError) {
    warn!(
        "{}/{} Augmentation failed for {} by {}, storing base record: {}",
        index, total, track.title, track.artist, error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library_store::LibraryStats;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeStore {
        existing: Mutex<HashSet<String>>,
        stored: Mutex<Vec<AugmentedLibraryTrack>>,
        fail_writes: bool,
    }

    impl FakeStore {
        fn new(existing: &[&str]) -> Self {
            Self {
                existing: Mutex::new(existing.iter().map(|s| s.to_string()).collect()),
                stored: Mutex::new(vec![]),
                fail_writes: false,
            }
        }
    }

    impl LibraryStore for FakeStore {
        fn exists(&self, id: &str) -> Result<bool> {
            Ok(self.existing.lock().unwrap().contains(id))
        }

        fn store(&self, track: &AugmentedLibraryTrack) -> Result<()> {
            if self.fail_writes {
                bail!("disk full");
            }
            self.existing
                .lock()
                .unwrap()
                .insert(track.track.platform_track_id.clone());
            self.stored.lock().unwrap().push(track.clone());
            Ok(())
        }

        fn get_by_platform_id(&self, id: &str) -> Result<Option<AugmentedLibraryTrack>> {
            Ok(self
                .stored
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.track.platform_track_id == id)
                .cloned())
        }

        fn get_all(&self) -> Result<Vec<AugmentedLibraryTrack>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        fn get_stats(&self) -> Result<LibraryStats> {
            let stored = self.stored.lock().unwrap();
            Ok(LibraryStats {
                total_tracks: stored.len(),
                augmented_tracks: stored.iter().filter(|t| t.is_augmented()).count(),
            })
        }
    }

    struct CountingAugmenter {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingAugmenter {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl TrackAugmenter for CountingAugmenter {
        async fn augment(
            &self,
            track: &LibraryTrack,
        ) -> Result<AugmentedLibraryTrack, AugmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AugmentError::ResolutionMiss {
                    title: track.title.clone(),
                    artist: track.artist.clone(),
                });
            }
            let mut augmented = AugmentedLibraryTrack::unaugmented(track.clone());
            augmented.mood = Some("upbeat".to_string());
            augmented.bpm = Some(96.0);
            augmented.tempo = Some("moderate".to_string());
            augmented.augmented_at = Some(1700000000);
            Ok(augmented)
        }
    }

    /// Tracks the highest number of concurrently running augmentations.
    struct ConcurrencyProbe {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TrackAugmenter for ConcurrencyProbe {
        async fn augment(
            &self,
            track: &LibraryTrack,
        ) -> Result<AugmentedLibraryTrack, AugmentError> {
            let running = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(AugmentedLibraryTrack::unaugmented(track.clone()))
        }
    }

    fn make_tracks(n: usize) -> Vec<LibraryTrack> {
        (0..n)
            .map(|i| LibraryTrack {
                platform_track_id: format!("t{}", i),
                title: format!("Title {}", i),
                artist: "Artist".to_string(),
                album: "Album".to_string(),
                genre: None,
                year: None,
                total_time: None,
                location: format!("/music/{}.mp3", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_skips_existing_tracks() {
        // Scenario: three tracks, one already stored. Exactly two
        // augmentation calls go out.
        let store = Arc::new(FakeStore::new(&["t0"]));
        let augmenter = Arc::new(CountingAugmenter::new(false));
        let importer = LibraryImporter::new(store.clone(), augmenter.clone(), 50);

        let report = importer.run(&make_tracks(3)).await;

        assert_eq!(augmenter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.augmented, 2);
        assert_eq!(store.stored.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_idempotent_rerun_does_nothing() {
        let store = Arc::new(FakeStore::new(&["t0", "t1", "t2"]));
        let augmenter = Arc::new(CountingAugmenter::new(false));
        let importer = LibraryImporter::new(store.clone(), augmenter.clone(), 50);

        let report = importer.run(&make_tracks(3)).await;

        assert_eq!(augmenter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.skipped, 3);
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_augment_failure_stores_base_record() {
        let store = Arc::new(FakeStore::new(&[]));
        let augmenter = Arc::new(CountingAugmenter::new(true));
        let importer = LibraryImporter::new(store.clone(), augmenter, 50);

        let report = importer.run(&make_tracks(2)).await;

        assert_eq!(report.fallback, 2);
        assert_eq!(report.augmented, 0);
        let stored = store.stored.lock().unwrap();
        assert_eq!(stored.len(), 2);
        for track in stored.iter() {
            assert!(!track.is_augmented());
            assert!(track.mood.is_none());
            assert!(!track.track.title.is_empty());
        }
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_stop_batch() {
        let mut store = FakeStore::new(&[]);
        store.fail_writes = true;
        let store = Arc::new(store);
        let augmenter = Arc::new(CountingAugmenter::new(false));
        let importer = LibraryImporter::new(store, augmenter, 50);

        let report = importer.run(&make_tracks(3)).await;

        // Every track fails individually but the run completes.
        assert_eq!(report.failed, 3);
        assert_eq!(report.total, 3);
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_chunk_size() {
        let store = Arc::new(FakeStore::new(&[]));
        let probe = Arc::new(ConcurrencyProbe {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let importer = LibraryImporter::new(store, probe.clone(), 4);

        importer.run(&make_tracks(16)).await;

        let peak = probe.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {} exceeded chunk size", peak);
        assert!(peak > 1, "chunk members should actually run concurrently");
    }

    #[tokio::test]
    async fn test_report_totals_add_up() {
        let store = Arc::new(FakeStore::new(&["t1"]));
        let augmenter = Arc::new(CountingAugmenter::new(false));
        let importer = LibraryImporter::new(store, augmenter, 2);

        let report = importer.run(&make_tracks(5)).await;

        assert_eq!(report.total, 5);
        assert_eq!(
            report.skipped + report.augmented + report.fallback + report.failed,
            5
        );
    }
}
