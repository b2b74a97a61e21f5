//! Track augmentation: resolve → aggregate → extract.
//!
//! The [`AiTrackAugmenter`] drives one track through candidate resolution,
//! context aggregation and schema-constrained attribute extraction. All of
//! its failure modes are recoverable from the batch's point of view; the
//! orchestrator answers them by storing the unaugmented base record.

use crate::context::{ContextBundle, ContextProvider, ContextSource};
use crate::library::{AugmentedLibraryTrack, LibraryTrack};
use crate::llm::{CompletionOptions, LlmError, LlmProvider, Message, ResponseSchema};
use crate::matching::FuzzyResolver;
use anyhow::anyhow;
use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a track's augmentation failed. Every variant is recoverable: the
/// orchestrator stores the base record instead of the enriched one.
#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("No match found for \"{title}\" by \"{artist}\"")]
    ResolutionMiss { title: String, artist: String },

    #[error("Context aggregation failed: {0}")]
    Aggregation(#[source] anyhow::Error),

    #[error("Extracted attributes are malformed: {0}")]
    SchemaValidation(String),

    #[error("Model call failed: {0}")]
    Model(#[source] LlmError),
}

/// Attributes extracted from the context bundle, exactly the fields of the
/// extraction schema.
#[derive(Debug, Clone, Deserialize)]
pub struct SongAttributes {
    pub themes: String,
    pub keywords: String,
    pub mood: String,
    pub bpm: f64,
    pub style: String,
}

lazy_static! {
    static ref SONG_ATTRIBUTES_SCHEMA: ResponseSchema = ResponseSchema {
        name: "song_attributes",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "themes": {"type": "string"},
                "keywords": {"type": "string"},
                "mood": {"type": "string"},
                "bpm": {"type": "number"},
                "style": {"type": "string"}
            },
            "required": ["themes", "keywords", "mood", "bpm", "style"],
            "additionalProperties": false
        }),
    };
}

/// Derive the categorical tempo label from a numeric BPM.
///
/// Boundaries are inclusive-low/exclusive-high: exactly 50 is "slow", not
/// "very slow".
pub fn derive_tempo(bpm: f64) -> &'static str {
    if bpm < 50.0 {
        "very slow"
    } else if bpm < 70.0 {
        "slow"
    } else if bpm < 100.0 {
        "moderate"
    } else if bpm < 120.0 {
        "fast"
    } else {
        "very fast"
    }
}

/// Capability trait the batch orchestrator depends on.
#[async_trait]
pub trait TrackAugmenter: Send + Sync {
    async fn augment(&self, track: &LibraryTrack) -> Result<AugmentedLibraryTrack, AugmentError>;
}

pub struct AiTrackAugmenter {
    context_source: Arc<dyn ContextSource>,
    context_provider: Arc<dyn ContextProvider>,
    resolver: FuzzyResolver,
    model: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl AiTrackAugmenter {
    pub fn new(
        context_source: Arc<dyn ContextSource>,
        context_provider: Arc<dyn ContextProvider>,
        resolver: FuzzyResolver,
        model: Arc<dyn LlmProvider>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            context_source,
            context_provider,
            resolver,
            model,
            options,
        }
    }

    async fn resolve_candidate(&self, track: &LibraryTrack) -> Result<String, AugmentError> {
        let candidates = self
            .context_source
            .search(&track.title, &track.artist)
            .await
            .map_err(AugmentError::Aggregation)?;

        let best = self
            .resolver
            .best(&track.title, &track.artist, &candidates)
            .ok_or_else(|| AugmentError::ResolutionMiss {
                title: track.title.clone(),
                artist: track.artist.clone(),
            })?;

        debug!(
            candidate_id = %best.id,
            candidate_title = %best.title,
            "Resolved \"{}\" by \"{}\"",
            track.title,
            track.artist
        );
        Ok(best.id.clone())
    }

    async fn extract(&self, bundle: &ContextBundle) -> Result<SongAttributes, AugmentError> {
        let prompt = format!(
            "Use the provided context to return a JSON object with this structure:\n\
             {{\"themes\": \"\", \"keywords\": \"\", \"mood\": \"\", \"bpm\": 0, \"style\": \"\"}}\n\
             Ground every field in the context only. Themes and keywords describe the \
             lyrical content; do not repeat the artist name or the song title in them.\n\
             Return exactly one JSON object and no other text.\n\n\
             # Context\n{}",
            bundle.render()
        );

        let value = self
            .model
            .complete_structured(
                &SONG_ATTRIBUTES_SCHEMA,
                &[Message::user(prompt)],
                &self.options,
            )
            .await
            .map_err(|e| match e {
                LlmError::SchemaValidation(msg) => AugmentError::SchemaValidation(msg),
                other => AugmentError::Model(other),
            })?;

        // Validate against the schema right at the call boundary.
        serde_json::from_value(value).map_err(|e| AugmentError::SchemaValidation(e.to_string()))
    }
}

#[async_trait]
impl TrackAugmenter for AiTrackAugmenter {
    async fn augment(&self, track: &LibraryTrack) -> Result<AugmentedLibraryTrack, AugmentError> {
        let candidate_id = self.resolve_candidate(track).await?;

        let bundle = self
            .context_provider
            .aggregate(&candidate_id)
            .await
            .map_err(AugmentError::Aggregation)?;
        if bundle.is_empty() {
            return Err(AugmentError::Aggregation(anyhow!("Empty context bundle")));
        }

        let attributes = self.extract(&bundle).await?;
        let tempo = derive_tempo(attributes.bpm);

        Ok(AugmentedLibraryTrack {
            track: track.clone(),
            themes: Some(attributes.themes),
            keywords: Some(attributes.keywords),
            mood: Some(attributes.mood),
            bpm: Some(attributes.bpm),
            tempo: Some(tempo.to_string()),
            style: Some(attributes.style),
            augmented_at: Some(chrono::Utc::now().timestamp()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SearchHit, SongDetails, TempoHintSource, WebContextAggregator};
    use crate::matching::{CandidateKind, MatchCandidate};
    use anyhow::Result;

    #[test]
    fn test_derive_tempo_boundaries() {
        assert_eq!(derive_tempo(49.0), "very slow");
        assert_eq!(derive_tempo(50.0), "slow");
        assert_eq!(derive_tempo(69.0), "slow");
        assert_eq!(derive_tempo(70.0), "moderate");
        assert_eq!(derive_tempo(99.0), "moderate");
        assert_eq!(derive_tempo(100.0), "fast");
        assert_eq!(derive_tempo(119.0), "fast");
        assert_eq!(derive_tempo(120.0), "very fast");
    }

    #[test]
    fn test_derive_tempo_degenerate_inputs() {
        assert_eq!(derive_tempo(0.0), "very slow");
        assert_eq!(derive_tempo(-10.0), "very slow");
        assert_eq!(derive_tempo(1000.0), "very fast");
    }

    struct FakeContextSource;

    #[async_trait]
    impl ContextSource for FakeContextSource {
        async fn search(&self, title: &str, artist: &str) -> Result<Vec<MatchCandidate>> {
            Ok(vec![MatchCandidate {
                id: "42".to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
                kind: CandidateKind::Song,
            }])
        }

        async fn fetch_details(&self, _candidate_id: &str) -> Result<SongDetails> {
            Ok(SongDetails {
                title: "Shape of You".to_string(),
                artist: "Ed Sheeran".to_string(),
                album: None,
                description: "A pop song.".to_string(),
                release_date: None,
                page_url: "https://example.com/song".to_string(),
            })
        }

        async fn fetch_text(&self, _url: &str) -> Result<String> {
            Ok(r#"<div data-lyrics-container="true">la la la</div>"#.to_string())
        }
    }

    struct NoMatchContextSource;

    #[async_trait]
    impl ContextSource for NoMatchContextSource {
        async fn search(&self, _title: &str, _artist: &str) -> Result<Vec<MatchCandidate>> {
            Ok(vec![])
        }

        async fn fetch_details(&self, _candidate_id: &str) -> Result<SongDetails> {
            unreachable!("nothing resolves, so nothing is fetched")
        }

        async fn fetch_text(&self, _url: &str) -> Result<String> {
            unreachable!("nothing resolves, so nothing is fetched")
        }
    }

    struct FakeTempoHints;

    #[async_trait]
    impl TempoHintSource for FakeTempoHints {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
            Ok(vec![SearchHit {
                snippet: "96 BPM".to_string(),
                content: "songbpm".to_string(),
            }])
        }
    }

    struct FakeModel {
        reply: serde_json::Value,
    }

    #[async_trait]
    impl LlmProvider for FakeModel {
        fn name(&self) -> &str {
            "fake"
        }

        fn model(&self) -> &str {
            "fake-model"
        }

        async fn complete_structured(
            &self,
            _schema: &ResponseSchema,
            messages: &[Message],
            _options: &CompletionOptions,
        ) -> Result<serde_json::Value, LlmError> {
            // The bundle is rendered into the single user message, with the
            // tempo evidence in its own section.
            assert!(messages[0].content.contains("## bpm\n96 BPM"));
            Ok(self.reply.clone())
        }
    }

    fn make_track() -> LibraryTrack {
        LibraryTrack {
            platform_track_id: "ID1".to_string(),
            title: "Shape of You".to_string(),
            artist: "Ed Sheeran".to_string(),
            album: "Divide".to_string(),
            genre: Some("Pop".to_string()),
            year: Some(2017),
            total_time: Some(233),
            location: "/music/shape.mp3".to_string(),
        }
    }

    fn make_augmenter(
        source: Arc<dyn ContextSource>,
        reply: serde_json::Value,
    ) -> AiTrackAugmenter {
        let provider = Arc::new(WebContextAggregator::new(
            source.clone(),
            Arc::new(FakeTempoHints),
            2,
        ));
        AiTrackAugmenter::new(
            source,
            provider,
            FuzzyResolver::default(),
            Arc::new(FakeModel { reply }),
            CompletionOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_augment_extracts_bpm_and_derives_tempo() {
        let augmenter = make_augmenter(
            Arc::new(FakeContextSource),
            serde_json::json!({
                "themes": "love, nightlife",
                "keywords": "club, bar, dancing",
                "mood": "upbeat",
                "bpm": 96,
                "style": "pop"
            }),
        );

        let augmented = augmenter.augment(&make_track()).await.unwrap();
        assert_eq!(augmented.bpm, Some(96.0));
        assert_eq!(augmented.tempo.as_deref(), Some("moderate"));
        assert_eq!(augmented.mood.as_deref(), Some("upbeat"));
        assert!(augmented.is_augmented());
    }

    #[tokio::test]
    async fn test_augment_no_match_is_resolution_miss() {
        let augmenter = make_augmenter(
            Arc::new(NoMatchContextSource),
            serde_json::json!({}),
        );

        let err = augmenter.augment(&make_track()).await.unwrap_err();
        assert!(matches!(err, AugmentError::ResolutionMiss { .. }));
    }

    #[tokio::test]
    async fn test_augment_malformed_reply_is_schema_validation() {
        // Missing "bpm", so deserialization at the boundary must fail.
        let augmenter = make_augmenter(
            Arc::new(FakeContextSource),
            serde_json::json!({
                "themes": "love",
                "keywords": "club",
                "mood": "upbeat",
                "style": "pop"
            }),
        );

        let err = augmenter.augment(&make_track()).await.unwrap_err();
        assert!(matches!(err, AugmentError::SchemaValidation(_)));
    }
}
