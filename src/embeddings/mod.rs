// Embeddings module
// Text chunking and the embedding model collaborator

pub mod chunking;
pub mod ollama;

use anyhow::Result;

/// Maps text to fixed-length numeric vectors.
///
/// Implementations must return one vector per input, in input order, with
/// the same dimensionality regardless of input length. Failures propagate;
/// callers decide whether a missing vector is fatal.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text (query time).
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts (ingestion time).
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
