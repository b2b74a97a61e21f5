mod file_config;

pub use file_config::{
    FileConfig, GeniusConfig, ImportConfig, LlmConfig, RetrievalConfig, TempoHintConfig,
    VectorIndexConfig,
};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub import: ImportSettings,
    pub genius: GeniusSettings,
    pub tempo_hint: TempoHintSettings,
    pub llm: LlmSettings,
    pub vector_index: VectorIndexSettings,
    pub retrieval: RetrievalSettings,
}

#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub chunk_size: usize,
    pub artist_threshold: i32,
    pub title_threshold: i32,
    pub tempo_snippet_limit: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            chunk_size: crate::import::DEFAULT_CHUNK_SIZE,
            artist_threshold: 80,
            title_threshold: 50,
            tempo_snippet_limit: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeniusSettings {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for GeniusSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.genius.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TempoHintSettings {
    pub url: String,
    pub engines: String,
}

impl Default for TempoHintSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8888".to_string(),
            engines: "google".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1:latest".to_string(),
            api_key: None,
            temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndexSettings {
    pub url: String,
    pub collection: String,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            collection: "mixtape-library".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub pool_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            pool_size: crate::playlist::DEFAULT_POOL_SIZE,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from("mixtape.db"));

        let import_file = file.import.unwrap_or_default();
        let import_defaults = ImportSettings::default();
        let import = ImportSettings {
            chunk_size: import_file.chunk_size.unwrap_or(import_defaults.chunk_size),
            artist_threshold: import_file
                .artist_threshold
                .unwrap_or(import_defaults.artist_threshold),
            title_threshold: import_file
                .title_threshold
                .unwrap_or(import_defaults.title_threshold),
            tempo_snippet_limit: import_file
                .tempo_snippet_limit
                .unwrap_or(import_defaults.tempo_snippet_limit),
        };
        if import.chunk_size == 0 {
            bail!("import.chunk_size must be at least 1");
        }
        for (name, threshold) in [
            ("artist_threshold", import.artist_threshold),
            ("title_threshold", import.title_threshold),
        ] {
            if !(-128..=128).contains(&threshold) {
                bail!("import.{} must be within -128..=128, got {}", name, threshold);
            }
        }

        let genius_file = file.genius.unwrap_or_default();
        let genius_defaults = GeniusSettings::default();
        let genius = GeniusSettings {
            api_key: genius_file.api_key,
            base_url: genius_file.base_url.unwrap_or(genius_defaults.base_url),
        };

        let tempo_file = file.tempo_hint.unwrap_or_default();
        let tempo_defaults = TempoHintSettings::default();
        let tempo_hint = TempoHintSettings {
            url: tempo_file.url.unwrap_or(tempo_defaults.url),
            engines: tempo_file.engines.unwrap_or(tempo_defaults.engines),
        };

        let llm_file = file.llm.unwrap_or_default();
        let llm_defaults = LlmSettings::default();
        let llm = LlmSettings {
            base_url: llm_file.base_url.unwrap_or(llm_defaults.base_url),
            model: llm_file.model.unwrap_or(llm_defaults.model),
            api_key: llm_file.api_key,
            temperature: llm_file.temperature.unwrap_or(llm_defaults.temperature),
        };

        let index_file = file.vector_index.unwrap_or_default();
        let index_defaults = VectorIndexSettings::default();
        let vector_index = VectorIndexSettings {
            url: index_file.url.unwrap_or(index_defaults.url),
            collection: index_file.collection.unwrap_or(index_defaults.collection),
        };

        let retrieval_file = file.retrieval.unwrap_or_default();
        let retrieval_defaults = RetrievalSettings::default();
        let retrieval = RetrievalSettings {
            pool_size: retrieval_file
                .pool_size
                .unwrap_or(retrieval_defaults.pool_size),
        };
        if retrieval.pool_size == 0 {
            bail!("retrieval.pool_size must be at least 1");
        }

        Ok(Self {
            db_path,
            import,
            genius,
            tempo_hint,
            llm,
            vector_index,
            retrieval,
        })
    }
}
