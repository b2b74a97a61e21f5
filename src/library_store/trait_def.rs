//! LibraryStore trait definition.

use crate::library::AugmentedLibraryTrack;
use anyhow::Result;

/// Summary statistics for the library database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryStats {
    pub total_tracks: usize,
    pub augmented_tracks: usize,
}

/// Trait for library storage backends.
///
/// One row per track keyed by `platform_track_id`; records are write-once
/// (re-importing an existing id is the caller's skip case, not an update).
/// Implementations must tolerate concurrent calls from as many tasks as the
/// import chunk size.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait LibraryStore: Send + Sync {
    /// Whether a track with this platform id has already been stored.
    fn exists(&self, platform_track_id: &str) -> Result<bool>;

    /// Insert a track record. Fails on write errors, including an attempt to
    /// store an id twice.
    fn store(&self, track: &AugmentedLibraryTrack) -> Result<()>;

    /// Get a track by platform id.
    fn get_by_platform_id(&self, platform_track_id: &str) -> Result<Option<AugmentedLibraryTrack>>;

    /// Get every stored track.
    fn get_all(&self) -> Result<Vec<AugmentedLibraryTrack>>;

    /// Get summary statistics.
    fn get_stats(&self) -> Result<LibraryStats>;
}
