//! Context aggregation for a resolved candidate.
//!
//! Fans out to the context source (details + lyrics page) and the tempo-hint
//! source and folds the results into a single [`ContextBundle`]. Any
//! sub-fetch failure fails the whole aggregation: a bundle missing lyrics is
//! judged not worth enriching from.

use super::{ContextBundle, ContextSource, TempoHintSource};
use anyhow::{bail, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    static ref LYRICS_CONTAINER_RE: Regex =
        Regex::new(r#"(?s)<div[^>]*data-lyrics-container="true"[^>]*>(.*?)</div>"#).unwrap();
    static ref BR_RE: Regex = Regex::new(r"<br\s*/?>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref BLANK_RUN_RE: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Capability trait for building a context bundle for a resolved candidate.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn aggregate(&self, candidate_id: &str) -> Result<ContextBundle>;
}

pub struct WebContextAggregator {
    source: Arc<dyn ContextSource>,
    tempo_hints: Arc<dyn TempoHintSource>,
    /// How many search snippets to keep as tempo evidence.
    snippet_limit: usize,
}

impl WebContextAggregator {
    pub fn new(
        source: Arc<dyn ContextSource>,
        tempo_hints: Arc<dyn TempoHintSource>,
        snippet_limit: usize,
    ) -> Self {
        Self {
            source,
            tempo_hints,
            snippet_limit,
        }
    }
}

#[async_trait]
impl ContextProvider for WebContextAggregator {
    async fn aggregate(&self, candidate_id: &str) -> Result<ContextBundle> {
        let details = self.source.fetch_details(candidate_id).await?;

        let page = self.source.fetch_text(&details.page_url).await?;
        let lyrics = extract_lyrics(&page);
        if lyrics.is_empty() {
            bail!("No lyrics found at {}", details.page_url);
        }

        let query = format!("BPM song {} by {}", details.title, details.artist);
        let hits = self.tempo_hints.search(&query).await?;
        let bpm_evidence = hits
            .iter()
            .take(self.snippet_limit)
            .map(|hit| hit.snippet.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            candidate_id,
            lyrics_chars = lyrics.len(),
            tempo_hits = hits.len(),
            "Aggregated context"
        );

        let mut bundle = ContextBundle::new();
        bundle.push("title", details.title);
        if let Some(album) = details.album {
            bundle.push("album", album);
        }
        bundle.push("artist", details.artist);
        bundle.push("description", details.description);
        if let Some(release_date) = details.release_date {
            bundle.push("releaseDate", release_date);
        }
        bundle.push("lyrics", lyrics);
        bundle.push("bpm", bpm_evidence);
        Ok(bundle)
    }
}

/// Pull the lyrics text out of a song page: concatenate the lyrics
/// containers, turn `<br>` into newlines, strip the remaining markup and
/// normalize blank-line runs.
fn extract_lyrics(html: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for capture in LYRICS_CONTAINER_RE.captures_iter(html) {
        parts.push(capture[1].to_string());
    }
    let joined = parts.join("\n");
    let with_breaks = BR_RE.replace_all(&joined, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);
    BLANK_RUN_RE
        .replace_all(decoded.trim(), "\n\n")
        .into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
