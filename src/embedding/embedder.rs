//! Library embedding pass.
//!
//! Walks every stored track and upserts its semantic document into the
//! vector index. Entries are keyed by platform id, so the pass is idempotent
//! and safe to re-run after new imports.

use super::{embedding_document, VectorIndex};
use crate::library_store::LibraryStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmbedReport {
    pub total: usize,
    pub embedded: usize,
    pub errors: usize,
}

pub struct LibraryEmbedder {
    store: Arc<dyn LibraryStore>,
    index: Arc<dyn VectorIndex>,
}

impl LibraryEmbedder {
    pub fn new(store: Arc<dyn LibraryStore>, index: Arc<dyn VectorIndex>) -> Self {
        Self { store, index }
    }

    pub async fn embed_library(&self) -> Result<EmbedReport> {
        let tracks = self.store.get_all()?;
        let total = tracks.len();
        let mut report = EmbedReport {
            total,
            ..Default::default()
        };

        for (index, track) in tracks.iter().enumerate() {
            info!(
                "{}/{} Embedding {} by {}...",
                index + 1,
                total,
                track.track.title,
                track.track.artist
            );

            let document = embedding_document(track);
            let metadata = serde_json::to_value(track)?;
            match self
                .index
                .upsert(&track.track.platform_track_id, &document, metadata)
                .await
            {
                Ok(()) => report.embedded += 1,
                Err(e) => {
                    warn!(
                        "Failed to embed {} by {}: {}",
                        track.track.title, track.track.artist, e
                    );
                    report.errors += 1;
                }
            }
        }

        info!(
            "Embedding complete: {} embedded, {} errors",
            report.embedded, report.errors
        );
        Ok(report)
    }
}
