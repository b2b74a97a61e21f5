//! Data models for library tracks.

use serde::{Deserialize, Serialize};

/// A track as parsed from the source library file. Created once per import
/// run and never mutated; identity is `platform_track_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryTrack {
    /// Stable identifier assigned by the source platform (e.g. the Apple
    /// Music persistent ID). Unique within a library.
    pub platform_track_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: Option<String>,
    pub year: Option<i64>,
    /// Duration in seconds.
    pub total_time: Option<i64>,
    /// Filesystem path of the audio file.
    pub location: String,
}

/// A library track merged with the attributes produced by augmentation.
///
/// Every augmentation field is nullable: augmentation may partially or fully
/// fail without invalidating the base record. When `tempo` is present it is
/// always the categorical label derived from `bpm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentedLibraryTrack {
    #[serde(flatten)]
    pub track: LibraryTrack,
    pub themes: Option<String>,
    pub keywords: Option<String>,
    pub mood: Option<String>,
    pub bpm: Option<f64>,
    pub tempo: Option<String>,
    pub style: Option<String>,
    /// Unix timestamp of the augmentation, absent for fallback records.
    pub augmented_at: Option<i64>,
}

impl AugmentedLibraryTrack {
    /// Wrap a base track with no augmentation data. This is what gets stored
    /// when enrichment fails: the track survives, its attributes don't.
    pub fn unaugmented(track: LibraryTrack) -> Self {
        Self {
            track,
            themes: None,
            keywords: None,
            mood: None,
            bpm: None,
            tempo: None,
            style: None,
            augmented_at: None,
        }
    }

    pub fn is_augmented(&self) -> bool {
        self.augmented_at.is_some()
    }
}
