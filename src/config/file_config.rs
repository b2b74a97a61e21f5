//! TOML file configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,

    // Feature configs
    pub import: Option<ImportConfig>,
    pub genius: Option<GeniusConfig>,
    pub tempo_hint: Option<TempoHintConfig>,
    pub llm: Option<LlmConfig>,
    pub vector_index: Option<VectorIndexConfig>,
    pub retrieval: Option<RetrievalConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ImportConfig {
    pub chunk_size: Option<usize>,
    pub artist_threshold: Option<i32>,
    pub title_threshold: Option<i32>,
    pub tempo_snippet_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct GeniusConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TempoHintConfig {
    pub url: Option<String>,
    pub engines: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub url: Option<String>,
    pub collection: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub pool_size: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
