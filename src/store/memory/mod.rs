
use anyhow::Result;
use chrono::Utc;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::ShelfError;
use crate::store::{DocumentStore, IndexRecord, MAX_LIST_SCAN};

/// In-memory document store with the same contract as [`ElasticStore`].
///
/// Scoring mirrors the production store: a lexical match on the query text
/// selects the candidate set (records sharing at least one case-insensitive
/// query token), and each candidate is scored `cosine(query, vector) + 1.0`.
/// Ties keep insertion order. Intended for tests and offline development;
/// everything lives behind a mutex so the watcher and query paths can share
/// one instance.
///
/// [`ElasticStore`]: crate::store::ElasticStore
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    index_created: bool,
    records: Vec<IndexRecord>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held for a document id.
    #[inline]
    pub fn record_count(&self, document_id: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .records
            .iter()
            .filter(|r| r.document_id == document_id)
            .count()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn lexical_match(query: &str, text: &str) -> bool {
    let text_lower = text.to_lowercase();
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|token| text_lower.contains(token))
}

impl DocumentStore for MemoryStore {
    fn index_exists(&self) -> Result<bool> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.index_created)
    }

    fn create_index(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.index_created {
            info!("In-memory index already exists");
        } else {
            inner.index_created = true;
        }
        Ok(())
    }

    fn drop_index(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.index_created {
            inner.index_created = false;
            inner.records.clear();
        } else {
            info!("In-memory index does not exist, nothing to delete");
        }
        Ok(())
    }

    fn document_exists(&self, document_id: &str) -> Result<bool> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.records.iter().any(|r| r.document_id == document_id))
    }

    fn delete_document(&self, document_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.records.len();
        inner.records.retain(|r| r.document_id != document_id);

        if inner.records.len() == before {
            info!("Document {} not found in index, nothing to delete", document_id);
        } else {
            debug!(
                "Deleted {} records for document {}",
                before - inner.records.len(),
                document_id
            );
        }
        Ok(())
    }

    fn upsert_chunks(
        &self,
        document_id: &str,
        chunks: &[String],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(ShelfError::Store(format!(
                "Chunk/vector count mismatch for {}: {} vs {}",
                document_id,
                chunks.len(),
                vectors.len()
            ))
            .into());
        }

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner.records.iter().any(|r| r.document_id == document_id) {
            info!("Document {} already exists. Skipping indexing.", document_id);
            return Ok(());
        }

        let created_at = Utc::now().to_rfc3339();
        for (i, (chunk, vector)) in chunks.iter().zip(vectors.iter()).enumerate() {
            inner.records.push(IndexRecord {
                document_id: document_id.to_string(),
                chunk_id: u32::try_from(i).unwrap_or(u32::MAX),
                text: chunk.clone(),
                vector: vector.clone(),
                created_at: created_at.clone(),
            });
        }

        Ok(())
    }

    fn search(&self, query_text: &str, query_vector: &[f32], top_n: usize) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let mut scored: Vec<(f32, &IndexRecord)> = inner
            .records
            .iter()
            .filter(|r| lexical_match(query_text, &r.text))
            .map(|r| (cosine_similarity(query_vector, &r.vector) + 1.0, r))
            .collect();

        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_n)
            .map(|(_, r)| r.text.clone())
            .collect())
    }

    fn list_document_ids(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let mut ids = Vec::new();
        for record in inner.records.iter().take(MAX_LIST_SCAN) {
            if !ids.contains(&record.document_id) {
                ids.push(record.document_id.clone());
            }
        }
        Ok(ids)
    }

    fn refresh(&self) -> Result<()> {
        // Writes are visible immediately; nothing to flush
        Ok(())
    }
}
