use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mixtape::augment::AiTrackAugmenter;
use mixtape::config::{AppConfig, CliConfig, FileConfig};
use mixtape::context::{GeniusClient, SearxClient, WebContextAggregator};
use mixtape::embedding::{ChromaClient, LibraryEmbedder, VectorIndex};
use mixtape::import::LibraryImporter;
use mixtape::library::{LibrarySource, PlistLibrary};
use mixtape::library_store::{LibraryStore, SqliteLibraryStore};
use mixtape::llm::{CompletionOptions, LlmProvider, OpenAiProvider};
use mixtape::matching::FuzzyResolver;
use mixtape::playlist::{AppleMusicPlaylistWriter, PlaylistGenerator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mixtape", about = "AI-augmented music library and playlist curation")]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI flags.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite library database file.
    #[clap(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a library export file, augmenting each track.
    Import {
        /// Path to the exported library XML (Music > Library > Export Library…).
        library: PathBuf,
    },
    /// Embed every stored track into the vector index.
    Embed,
    /// Generate an AI-curated playlist from a free-text prompt.
    Playlist {
        /// Name of the playlist to create.
        name: String,
        /// Free-text description of what the playlist should feel like.
        prompt: String,
    },
    /// Print library statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(
        &CliConfig {
            db_path: cli_args.db.clone(),
        },
        file_config,
    )?;

    info!("Opening library database at {:?}...", config.db_path);
    let store = Arc::new(SqliteLibraryStore::new(&config.db_path)?);

    match cli_args.command {
        Command::Import { library } => run_import(&config, store, &library).await,
        Command::Embed => run_embed(&config, store).await,
        Command::Playlist { name, prompt } => run_playlist(&config, store, &name, &prompt).await,
        Command::Stats => run_stats(store),
    }
}

async fn run_import(
    config: &AppConfig,
    store: Arc<SqliteLibraryStore>,
    library_path: &PathBuf,
) -> Result<()> {
    let api_key = config
        .genius
        .api_key
        .clone()
        .context("genius.api_key must be set in the config file to import")?;

    let library = PlistLibrary::new(library_path);
    let tracks = library.get_tracks()?;
    info!("Loaded {} tracks from {:?}", tracks.len(), library_path);

    let context_source = Arc::new(GeniusClient::with_base_url(
        api_key,
        config.genius.base_url.clone(),
    )?);
    let tempo_hints = Arc::new(SearxClient::new(
        config.tempo_hint.url.clone(),
        config.tempo_hint.engines.clone(),
    )?);
    let aggregator = Arc::new(WebContextAggregator::new(
        context_source.clone(),
        tempo_hints,
        config.import.tempo_snippet_limit,
    ));
    let model = make_model(config);
    let augmenter = Arc::new(AiTrackAugmenter::new(
        context_source,
        aggregator,
        FuzzyResolver::new(
            config.import.artist_threshold,
            config.import.title_threshold,
        ),
        model,
        completion_options(config),
    ));

    let importer = LibraryImporter::new(store, augmenter, config.import.chunk_size);
    let report = importer.run(&tracks).await;

    if report.failed > 0 {
        info!(
            "{} tracks could not be stored; re-running the import will retry them",
            report.failed
        );
    }
    Ok(())
}

async fn run_embed(config: &AppConfig, store: Arc<SqliteLibraryStore>) -> Result<()> {
    let index = make_index(config)?;
    let embedder = LibraryEmbedder::new(store, index);
    embedder.embed_library().await?;
    Ok(())
}

async fn run_playlist(
    config: &AppConfig,
    store: Arc<SqliteLibraryStore>,
    name: &str,
    prompt: &str,
) -> Result<()> {
    let generator = PlaylistGenerator::new(
        store,
        make_index(config)?,
        make_model(config),
        Arc::new(AppleMusicPlaylistWriter::new()),
        config.retrieval.pool_size,
        completion_options(config),
    );

    let started = Instant::now();
    let tracks = generator.generate(name, prompt).await?;
    info!(
        "Generated a playlist with {} tracks in {} seconds",
        tracks.len(),
        started.elapsed().as_secs()
    );

    for track in &tracks {
        println!("* {} by {}", track.track.title, track.track.artist);
    }
    Ok(())
}

fn run_stats(store: Arc<SqliteLibraryStore>) -> Result<()> {
    let stats = store.get_stats()?;
    println!("Tracks:    {}", stats.total_tracks);
    println!("Augmented: {}", stats.augmented_tracks);
    Ok(())
}

fn make_model(config: &AppConfig) -> Arc<dyn LlmProvider> {
    Arc::new(OpenAiProvider::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.api_key.clone(),
    ))
}

fn make_index(config: &AppConfig) -> Result<Arc<dyn VectorIndex>> {
    Ok(Arc::new(ChromaClient::new(
        config.vector_index.url.clone(),
        config.vector_index.collection.clone(),
    )?))
}

fn completion_options(config: &AppConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.llm.temperature,
        ..Default::default()
    }
}
