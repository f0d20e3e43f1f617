// Retrieval module
// Similarity search over the index, used standalone and by the chat path


use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embeddings::EmbeddingProvider;
use crate::store::DocumentStore;

/// How many chunks a query returns when the caller does not say.
pub const DEFAULT_TOP_N: usize = 5;

/// Query path over the shared store and embedder.
pub struct SimilaritySearch {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SimilaritySearch {
    #[inline]
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// The `top_n` most similar chunk texts for a query, best first.
    ///
    /// Embedding failures propagate; a store search failure degrades to an
    /// empty result so a flaky index turns into an ungrounded answer rather
    /// than a dead query path.
    #[inline]
    pub fn retrieve(&self, query: &str, top_n: usize) -> Result<Vec<String>> {
        let query_vector = self.embedder.embed(query)?;

        match self.store.search(query, &query_vector, top_n) {
            Ok(chunks) => {
                debug!("Retrieved {} chunks for query", chunks.len());
                Ok(chunks)
            }
            Err(e) => {
                warn!("Search failed, returning no context: {:#}", e);
                Ok(Vec::new())
            }
        }
    }
}
