//! AI playlist generation.
//!
//! Retrieval then curation: the prompt pulls a large candidate pool out of
//! the vector index, and the model picks and orders the final set. Diversity
//! and flow are delegated entirely to the model; this module only checks
//! that the reply is structurally well-formed.

mod apple_music;

pub use apple_music::AppleMusicPlaylistWriter;

use crate::embedding::VectorIndex;
use crate::library::AugmentedLibraryTrack;
use crate::library_store::LibraryStore;
use crate::llm::{CompletionOptions, LlmError, LlmProvider, Message, ResponseSchema};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_POOL_SIZE: usize = 1000;

/// Errors from the playlist automation collaborator.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Playlist host application unavailable: {0}")]
    HostUnavailable(String),

    #[error("Playlist creation script failed: {0}")]
    ScriptFailed(String),
}

/// Capability trait for creating a playlist in the host music application.
#[async_trait]
pub trait PlaylistWriter: Send + Sync {
    async fn create_playlist(&self, name: &str, track_ids: &[String])
        -> Result<(), AutomationError>;
}

lazy_static! {
    static ref PLAYLIST_SCHEMA: ResponseSchema = ResponseSchema {
        name: "playlist_selection",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "track_ids": {
                    "type": "array",
                    "items": {"type": "string"}
                }
            },
            "required": ["track_ids"],
            "additionalProperties": false
        }),
    };
}

#[derive(Debug, Deserialize)]
struct PlaylistSelection {
    track_ids: Vec<String>,
}

const CURATOR_SYSTEM_PROMPT: &str = "You are an expert DJ and music connoisseur. \
Your task is to build playlists of twenty songs. You will be given a playlist name, \
a playlist description and a list of candidate tracks with their mood, style, tempo, \
genre, year of release and themes.\n\
\n\
# Steps:\n\
1. Analyze the candidate tracks.\n\
2. Analyze the playlist name and description.\n\
3. Pick tracks that fit the playlist. Bring variety (different genres, artists, \
tempos, years) unless the description asks for something narrower (example: \
\"only tracks from the 80s\").\n\
4. Select exactly twenty tracks. Every playlist must have twenty tracks.\n\
5. Order them so the mood and tempo of the playlist flow well.\n\
6. Return a JSON object with the twenty chosen track IDs in order, and no other text.";

pub struct PlaylistGenerator {
    store: Arc<dyn LibraryStore>,
    index: Arc<dyn VectorIndex>,
    model: Arc<dyn LlmProvider>,
    writer: Arc<dyn PlaylistWriter>,
    pool_size: usize,
    options: CompletionOptions,
}

impl PlaylistGenerator {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn LlmProvider>,
        writer: Arc<dyn PlaylistWriter>,
        pool_size: usize,
        options: CompletionOptions,
    ) -> Self {
        Self {
            store,
            index,
            model,
            writer,
            pool_size,
            options,
        }
    }

    /// Generate a playlist for a `(name, prompt)` pair and best-effort create
    /// it in the host application. Returns the curated tracks in the order
    /// the model chose them.
    pub async fn generate(
        &self,
        name: &str,
        prompt: &str,
    ) -> Result<Vec<AugmentedLibraryTrack>> {
        let neighbors = self
            .index
            .similarity_search(prompt, self.pool_size)
            .await
            .context("Vector retrieval failed")?;
        info!("Retrieved {} candidates for \"{}\"", neighbors.len(), name);

        let candidates = self.hydrate(neighbors.iter().map(|(id, _)| id.as_str()));
        if candidates.is_empty() {
            bail!("No candidates found for prompt; is the library embedded?");
        }

        let track_ids = self.curate(name, prompt, &candidates).await?;
        info!("Model selected {} tracks for \"{}\"", track_ids.len(), name);

        // Creation is best effort; the curated list stands either way.
        if let Err(e) = self.writer.create_playlist(name, &track_ids).await {
            warn!("Failed to create playlist \"{}\": {}", name, e);
        }

        Ok(self.hydrate(track_ids.iter().map(|id| id.as_str())))
    }

    /// Look up each id in storage, preserving order and dropping (with a
    /// warning) ids that don't hydrate.
    fn hydrate<'a>(
        &self,
        ids: impl Iterator<Item = &'a str>,
    ) -> Vec<AugmentedLibraryTrack> {
        ids.filter_map(|id| match self.store.get_by_platform_id(id) {
            Ok(Some(track)) => Some(track),
            Ok(None) => {
                warn!("Track {} not found in storage, dropping", id);
                None
            }
            Err(e) => {
                warn!("Failed to hydrate track {}: {}", id, e);
                None
            }
        })
        .collect()
    }

    async fn curate(
        &self,
        name: &str,
        prompt: &str,
        candidates: &[AugmentedLibraryTrack],
    ) -> Result<Vec<String>> {
        let user_prompt = format!(
            "# Name: {}\n# Description:\n{}\n# Tracks\n{}",
            name,
            prompt,
            render_candidate_cards(candidates)
        );
        let messages = [
            Message::system(CURATOR_SYSTEM_PROMPT),
            Message::user(user_prompt),
        ];

        let value = self
            .model
            .complete_structured(&PLAYLIST_SCHEMA, &messages, &self.options)
            .await?;

        let selection: PlaylistSelection = serde_json::from_value(value)
            .map_err(|e| LlmError::SchemaValidation(e.to_string()))?;
        Ok(selection.track_ids)
    }
}

/// Render each candidate as a compact attribute card, omitting absent
/// fields.
fn render_candidate_cards(tracks: &[AugmentedLibraryTrack]) -> String {
    tracks
        .iter()
        .map(render_card)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_card(track: &AugmentedLibraryTrack) -> String {
    let mut lines = vec![format!("## Track ID: {}", track.track.platform_track_id)];
    if let Some(mood) = &track.mood {
        lines.push(format!("Mood: {}", mood));
    }
    if let Some(style) = &track.style {
        lines.push(format!("Style: {}", style));
    }
    if let (Some(tempo), Some(bpm)) = (&track.tempo, track.bpm) {
        lines.push(format!("Tempo: {} ({} BPM)", tempo, bpm));
    }
    if let Some(genre) = &track.track.genre {
        lines.push(format!("Genre: {}", genre));
    }
    if let Some(year) = track.track.year {
        lines.push(format!("Year: {}", year));
    }
    if let Some(themes) = &track.themes {
        lines.push(format!("Themes: {}", themes));
    }
    lines.join("\n")
}
