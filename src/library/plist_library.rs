//! Apple Music library XML parsing.
//!
//! Reads the property-list file produced by Music's "Export Library…" and
//! flattens it into [`LibraryTrack`] records. Non-audio entries (videos,
//! PDFs) and entries without a file location are dropped.

use super::{LibrarySource, LibraryTrack};
use anyhow::{Context, Result};
use plist::{Dictionary, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct PlistLibrary {
    xml_path: PathBuf,
}

impl PlistLibrary {
    pub fn new<P: AsRef<Path>>(xml_path: P) -> Self {
        Self {
            xml_path: xml_path.as_ref().to_path_buf(),
        }
    }
}

impl LibrarySource for PlistLibrary {
    fn get_tracks(&self) -> Result<Vec<LibraryTrack>> {
        let value = Value::from_file(&self.xml_path)
            .with_context(|| format!("Failed to read library file {:?}", self.xml_path))?;

        let root = value
            .as_dictionary()
            .context("Library root is not a dictionary")?;
        let tracks_dict = root
            .get("Tracks")
            .context("Library has no Tracks key")?
            .as_dictionary()
            .context("Tracks is not a dictionary")?;

        let mut tracks = Vec::new();
        for (_key, entry) in tracks_dict {
            let Some(dict) = entry.as_dictionary() else {
                continue;
            };
            if let Some(track) = parse_track(dict) {
                tracks.push(track);
            }
        }

        debug!(
            "Parsed {} audio tracks from {:?}",
            tracks.len(),
            self.xml_path
        );
        Ok(tracks)
    }
}

fn parse_track(dict: &Dictionary) -> Option<LibraryTrack> {
    let get_str = |key: &str| dict.get(key).and_then(|v| v.as_string());
    let get_int = |key: &str| dict.get(key).and_then(|v| v.as_signed_integer());

    // Only audio files make it into the library; skip videos, booklets etc.
    let kind = get_str("Kind")?;
    if !kind.to_lowercase().contains("audio") {
        return None;
    }

    let location = get_str("Location")?;

    Some(LibraryTrack {
        platform_track_id: get_str("Persistent ID").unwrap_or("0").to_string(),
        title: get_str("Name").unwrap_or_default().to_string(),
        artist: get_str("Artist").unwrap_or_default().to_string(),
        album: get_str("Album").unwrap_or_default().to_string(),
        genre: get_str("Genre").map(|s| s.to_string()),
        year: get_int("Year"),
        // Total Time is in milliseconds.
        total_time: get_int("Total Time").map(|ms| ms / 1000),
        location: decode_location(location),
    })
}

/// The exported Location is a percent-encoded file URL
/// (`file://localhost/Users/...`); turn it into a plain filesystem path.
fn decode_location(location: &str) -> String {
    let decoded = urlencoding::decode(location)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| location.to_string());
    decoded
        .trim_start_matches("file://localhost")
        .trim_start_matches("file://")
        .to_string()
}
