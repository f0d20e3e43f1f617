use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::chat::{ChatMessage, OllamaChat};
use crate::config::{Config, get_config_dir};
use crate::embeddings::ollama::OllamaEmbedder;
use crate::extract::PdfExtractor;
use crate::ingest::IngestionPipeline;
use crate::retrieval::SimilaritySearch;
use crate::store::{DocumentStore, ElasticStore};
use crate::watcher::DirectoryWatcher;

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(config_dir)
}

fn connect_store(config: &Config) -> Result<Arc<ElasticStore>> {
    let store = ElasticStore::connect(
        &config.elasticsearch,
        config.ollama.embedding_dimension as usize,
    )
    .context("Failed to connect to Elasticsearch")?;
    Ok(Arc::new(store))
}

fn build_embedder(config: &Config) -> Result<Arc<OllamaEmbedder>> {
    let embedder = OllamaEmbedder::new(&config.ollama).context("Failed to create Ollama client")?;

    if let Err(e) = embedder.health_check() {
        warn!("Ollama health check failed: {:#}", e);
        println!("Warning: Ollama may not be ready. Embedding requests may fail.");
    }

    Ok(Arc::new(embedder))
}

fn build_pipeline(config: &Config) -> Result<IngestionPipeline> {
    let store = connect_store(config)?;
    let embedder = build_embedder(config)?;

    Ok(IngestionPipeline::new(
        store,
        embedder,
        Arc::new(PdfExtractor),
        config.chunking.clone(),
    ))
}

/// Write the default configuration and create the index
#[inline]
pub fn init() -> Result<()> {
    let config = load_config()?;

    if config.config_file_path().exists() {
        println!("Configuration already exists: {}", config.config_file_path().display());
    } else {
        config.save().context("Failed to write default configuration")?;
        println!("Wrote default configuration: {}", config.config_file_path().display());
    }

    let store = connect_store(&config)?;
    store.create_index().context("Failed to create index")?;
    println!(
        "Index '{}' is ready on {}://{}:{}",
        config.elasticsearch.index,
        config.elasticsearch.protocol,
        config.elasticsearch.host,
        config.elasticsearch.port
    );

    if !config.watcher.data_dir.exists() {
        std::fs::create_dir_all(&config.watcher.data_dir).with_context(|| {
            format!(
                "Failed to create data directory {}",
                config.watcher.data_dir.display()
            )
        })?;
        println!("Created data directory: {}", config.watcher.data_dir.display());
    }

    Ok(())
}

/// Run one reconciliation pass over the data directory
#[inline]
pub fn ingest() -> Result<()> {
    let config = load_config()?;
    let pipeline = build_pipeline(&config)?;

    let stats = pipeline.synchronize(&config.watcher.data_dir)?;

    println!("Ingestion pass over {}:", config.watcher.data_dir.display());
    println!("  Indexed:  {} ({} chunks)", stats.documents_indexed, stats.chunks_created);
    println!("  Skipped:  {}", stats.documents_skipped);
    println!("  Removed:  {}", stats.documents_removed);
    println!("  Failed:   {}", stats.documents_failed);

    Ok(())
}

/// Drop the index and re-ingest everything
#[inline]
pub fn rebuild() -> Result<()> {
    let config = load_config()?;
    let pipeline = build_pipeline(&config)?;

    println!("Dropping index and re-ingesting {}", config.watcher.data_dir.display());
    let stats = pipeline.rebuild_from_scratch(&config.watcher.data_dir)?;

    println!("Rebuild complete:");
    println!("  Indexed:  {} ({} chunks)", stats.documents_indexed, stats.chunks_created);
    println!("  Failed:   {}", stats.documents_failed);

    Ok(())
}

/// Watch the data directory and ingest on change until interrupted
#[inline]
pub async fn watch() -> Result<()> {
    let config = load_config()?;
    let pipeline = Arc::new(build_pipeline(&config)?);

    let watcher = DirectoryWatcher::new(
        pipeline,
        config.watcher.data_dir.clone(),
        Duration::from_millis(config.watcher.debounce_ms),
    );

    println!(
        "Watching {} (debounce {}ms). Press Ctrl+C to stop.",
        config.watcher.data_dir.display(),
        config.watcher.debounce_ms
    );

    tokio::select! {
        result = watcher.run() => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nReceived interrupt signal, shutting down");
            info!("Watcher stopped by interrupt");
            Ok(())
        }
    }
}

/// Print the most similar chunks for a query
#[inline]
pub fn search(query: &str, top_n: usize) -> Result<()> {
    let config = load_config()?;
    let store = connect_store(&config)?;
    let embedder = build_embedder(&config)?;

    let retrieval = SimilaritySearch::new(store, embedder);
    let chunks = retrieval.retrieve(query, top_n)?;

    if chunks.is_empty() {
        println!("No matching chunks found.");
        return Ok(());
    }

    println!("Top {} chunks:", chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        println!();
        println!("{}. {}", i + 1, chunk);
    }

    Ok(())
}

/// Answer a question grounded in retrieved chunks
#[inline]
pub fn ask(query: &str, top_n: usize) -> Result<()> {
    let config = load_config()?;
    let store = connect_store(&config)?;
    let embedder = build_embedder(&config)?;

    let retrieval = SimilaritySearch::new(store, embedder);
    let facts = retrieval.retrieve(query, top_n)?;

    if facts.is_empty() {
        println!("(no indexed context matched; answering ungrounded)");
    }

    let chat = OllamaChat::new(&config.ollama)?;
    let answer = chat.send(vec![ChatMessage::user(query)], &facts)?;

    println!("{}", answer);
    Ok(())
}

/// List every indexed document id
#[inline]
pub fn list() -> Result<()> {
    let config = load_config()?;
    let store = connect_store(&config)?;

    let ids = store.list_document_ids()?;
    if ids.is_empty() {
        println!("No documents have been indexed yet.");
        println!("Use 'docshelf ingest' or 'docshelf watch' to index PDF files.");
        return Ok(());
    }

    println!("Indexed documents ({} total):", ids.len());
    for id in &ids {
        println!("  {}", id);
    }

    Ok(())
}

/// Delete every record for a document id
#[inline]
pub fn delete(document_id: &str) -> Result<()> {
    let config = load_config()?;
    let store = connect_store(&config)?;

    if !store.document_exists(document_id)? {
        println!("Document not found in index: {}", document_id);
        return Ok(());
    }

    store
        .delete_document(document_id)
        .with_context(|| format!("Failed to delete {}", document_id))?;
    println!("Deleted all records for: {}", document_id);
    println!("Note: if the source file still exists, the next pass will re-index it.");

    Ok(())
}

/// Print the active configuration as TOML
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;

    println!("Configuration file: {}", config.config_file_path().display());
    if !config.config_file_path().exists() {
        println!("(file does not exist, showing defaults)");
    }
    println!();

    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);

    Ok(())
}
