//! Track context gathering.
//!
//! Resolves a track against the match/context source and collects the
//! heterogeneous evidence (descriptive text, lyrics, tempo hints) the
//! structured extractor works from.

mod aggregator;
mod genius;
mod tempo_hint;

pub use aggregator::{ContextProvider, WebContextAggregator};
pub use genius::GeniusClient;
pub use tempo_hint::SearxClient;

use crate::matching::MatchCandidate;
use anyhow::Result;
use async_trait::async_trait;

/// Descriptive fields of a resolved song record.
#[derive(Debug, Clone)]
pub struct SongDetails {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub description: String,
    pub release_date: Option<String>,
    /// URL of the page carrying the song's full text (lyrics).
    pub page_url: String,
}

/// Capability trait for the external match/context source. All calls are
/// read-only.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Search the source for candidates matching a `(title, artist)` pair,
    /// in source-ranked order. Hits missing required fields are dropped
    /// during decoding, before they ever reach scoring.
    async fn search(&self, title: &str, artist: &str) -> Result<Vec<MatchCandidate>>;

    /// Fetch the rich record behind a resolved candidate id.
    async fn fetch_details(&self, candidate_id: &str) -> Result<SongDetails>;

    /// Fetch raw text (HTML) from a content URL.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// A web search hit used as free-text tempo evidence.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub snippet: String,
    pub content: String,
}

/// Capability trait for the tempo-hint source.
#[async_trait]
pub trait TempoHintSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Ephemeral, per-resolution bundle of context sections, consumed once by
/// the structured extractor. Section order is insertion order and carries
/// through to the rendered prompt.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    sections: Vec<(String, String)>,
}

impl ContextBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.sections.push((key.into(), text.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Render the bundle as one labeled section per source key.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|(key, text)| format!("## {}\n{}", key, text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
