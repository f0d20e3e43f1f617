// Ingestion module
// Orchestrates extract -> chunk -> embed -> index for the watched directory


use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::ShelfError;
use crate::embeddings::EmbeddingProvider;
use crate::embeddings::chunking::{ChunkingConfig, chunk_text};
use crate::extract::TextExtractor;
use crate::store::DocumentStore;

/// Derive the stable document id for a source file.
///
/// Identity is the file's base name without its extension, never the file
/// contents, so re-ingesting an unchanged file hits the same id and renaming
/// a file creates a new logical document.
#[inline]
pub fn document_id(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// What happened to one document during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The document was extracted, chunked, embedded and written.
    Indexed { chunks: usize },
    /// The document id was already present in the index.
    Skipped,
}

/// Totals for one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub documents_failed: usize,
    pub documents_removed: usize,
    pub chunks_created: usize,
}

/// Pipeline from a directory of PDF files to index records.
///
/// Collaborators are shared trait objects so the watcher task and the query
/// path can hold the same store and embedder.
pub struct IngestionPipeline {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn TextExtractor>,
    chunking: ChunkingConfig,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn TextExtractor>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            extractor,
            chunking,
        }
    }

    /// Ingest a single document unless its id is already indexed.
    ///
    /// Ingestion is at-most-once per document id for the lifetime of the
    /// index: the existence check makes a rerun over an unchanged directory
    /// produce no new records.
    #[inline]
    pub fn process_document(&self, doc_id: &str, path: &Path) -> Result<IngestOutcome> {
        if self
            .store
            .document_exists(doc_id)
            .with_context(|| format!("Failed existence check for {}", doc_id))?
        {
            info!("Document {} already indexed, skipping", doc_id);
            return Ok(IngestOutcome::Skipped);
        }

        info!("Processing document {} from {}", doc_id, path.display());

        let text = self.extractor.extract(path)?;
        if text.trim().is_empty() {
            return Err(ShelfError::Extraction(format!(
                "No text extracted from {}",
                path.display()
            ))
            .into());
        }

        let chunks = chunk_text(&text, &self.chunking);
        debug!("Generated {} chunks for {}", chunks.len(), doc_id);

        let vectors = self
            .embedder
            .embed_batch(&chunks)
            .with_context(|| format!("Failed to embed chunks for {}", doc_id))?;

        self.store
            .upsert_chunks(doc_id, &chunks, &vectors)
            .with_context(|| format!("Failed to index chunks for {}", doc_id))?;

        info!("Processing completed for {}", doc_id);
        Ok(IngestOutcome::Indexed {
            chunks: chunks.len(),
        })
    }

    /// Ingest every PDF file directly inside `dir` (non-recursive).
    ///
    /// Failures are isolated per document: one bad file is logged and the
    /// pass continues with the rest.
    #[inline]
    pub fn process_directory(&self, dir: &Path) -> Result<IngestStats> {
        let mut stats = IngestStats::default();

        for path in pdf_files(dir)? {
            let Some(doc_id) = document_id(&path) else {
                continue;
            };

            match self.process_document(&doc_id, &path) {
                Ok(IngestOutcome::Indexed { chunks }) => {
                    stats.documents_indexed += 1;
                    stats.chunks_created += chunks;
                }
                Ok(IngestOutcome::Skipped) => {
                    stats.documents_skipped += 1;
                }
                Err(e) => {
                    error!("Failed to ingest {}: {:#}", doc_id, e);
                    stats.documents_failed += 1;
                }
            }
        }

        info!(
            "Ingestion pass over {} complete: {} indexed, {} skipped, {} failed",
            dir.display(),
            stats.documents_indexed,
            stats.documents_skipped,
            stats.documents_failed
        );

        Ok(stats)
    }

    /// Delete index records for documents whose source files are gone.
    #[inline]
    pub fn remove_missing_documents(&self, dir: &Path) -> Result<usize> {
        let present: HashSet<String> = pdf_files(dir)?
            .iter()
            .filter_map(|p| document_id(p))
            .collect();

        let mut removed = 0;
        for doc_id in self.store.list_document_ids()? {
            if !present.contains(&doc_id) {
                info!("Source file for {} is gone, removing from index", doc_id);
                self.store
                    .delete_document(&doc_id)
                    .with_context(|| format!("Failed to delete records for {}", doc_id))?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// One full reconciliation pass: drop documents whose files were removed,
    /// then ingest whatever is new. This is what a debounced watcher event
    /// ultimately runs.
    #[inline]
    pub fn synchronize(&self, dir: &Path) -> Result<IngestStats> {
        self.store.create_index()?;

        let removed = self.remove_missing_documents(dir)?;
        let mut stats = self.process_directory(dir)?;
        stats.documents_removed = removed;

        Ok(stats)
    }

    /// Wipe the index and re-ingest the directory from nothing.
    ///
    /// Destructive: every record for every document is lost, whether or not
    /// its source file still exists.
    #[inline]
    pub fn rebuild_from_scratch(&self, dir: &Path) -> Result<IngestStats> {
        info!("Rebuilding index from scratch for {}", dir.display());

        self.store.drop_index()?;
        self.store.create_index()?;
        self.process_directory(dir)
    }
}

/// PDF files directly inside `dir`, in stable name order.
fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ShelfError::Config(format!(
            "Data directory '{}' does not exist or is not a directory",
            dir.display()
        ))
        .into());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        let is_pdf = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
