//! Vector-index abstraction and library embedding.

mod chroma;
mod embedder;

pub use chroma::ChromaClient;
pub use embedder::{EmbedReport, LibraryEmbedder};

use crate::library::AugmentedLibraryTrack;
use anyhow::Result;
use async_trait::async_trait;

/// Capability trait for the vector index. Entries are keyed by
/// `platform_track_id`, so re-embedding the same track is an upsert.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, id: &str, text: &str, metadata: serde_json::Value) -> Result<()>;

    /// Return up to `k` nearest neighbors for a free-text query, most similar
    /// first, as `(id, score)` pairs.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<(String, f32)>>;
}

/// Render a track's semantic attributes into the document that gets
/// embedded. Base metadata like title and artist is deliberately left out:
/// retrieval should match on meaning, not on names the prompt won't mention.
pub fn embedding_document(track: &AugmentedLibraryTrack) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(themes) = &track.themes {
        lines.push(format!("Themes: {}", themes));
    }
    if let Some(mood) = &track.mood {
        lines.push(format!("Mood: {}", mood));
    }
    if let Some(bpm) = track.bpm {
        lines.push(format!("BPM: {}", bpm));
    }
    if let Some(tempo) = &track.tempo {
        lines.push(format!("Tempo: {}", tempo));
    }
    if let Some(style) = &track.style {
        lines.push(format!("Style: {}", style));
    }
    if let Some(year) = track.track.year {
        lines.push(format!("Year: {}", year));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryTrack;

    fn make_track() -> AugmentedLibraryTrack {
        AugmentedLibraryTrack {
            track: LibraryTrack {
                platform_track_id: "t1".to_string(),
                title: "Song".to_string(),
                artist: "Artist".to_string(),
                album: "Album".to_string(),
                genre: None,
                year: Some(1987),
                total_time: None,
                location: "/a.mp3".to_string(),
            },
            themes: Some("heartbreak".to_string()),
            keywords: None,
            mood: Some("wistful".to_string()),
            bpm: Some(72.0),
            tempo: Some("moderate".to_string()),
            style: Some("synthpop".to_string()),
            augmented_at: Some(1700000000),
        }
    }

    #[test]
    fn test_document_includes_present_fields() {
        let doc = embedding_document(&make_track());
        assert_eq!(
            doc,
            "Themes: heartbreak\nMood: wistful\nBPM: 72\nTempo: moderate\nStyle: synthpop\nYear: 1987"
        );
    }

    #[test]
    fn test_document_omits_absent_fields() {
        let mut track = make_track();
        track.themes = None;
        track.mood = None;
        track.bpm = None;
        track.tempo = None;
        track.style = None;
        track.track.year = None;
        assert_eq!(embedding_document(&track), "");
    }

    #[test]
    fn test_document_excludes_title_and_artist() {
        let doc = embedding_document(&make_track());
        assert!(!doc.contains("Song"));
        assert!(!doc.contains("Artist"));
    }
}
