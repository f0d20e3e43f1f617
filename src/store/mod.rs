// Document store module
// Search-index abstraction shared by the ingestion and query paths

pub mod elastic;
pub mod memory;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use elastic::ElasticStore;
pub use memory::MemoryStore;

/// Maximum number of records scanned when listing document ids.
/// Listing is best-effort beyond this bound.
pub const MAX_LIST_SCAN: usize = 1000;

/// One persisted chunk: the unit written to and returned by the index.
///
/// The storage key is system-assigned; `document_id` and `chunk_id` are
/// queryable fields, so document existence is answered by a query rather
/// than a key lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    pub document_id: String,
    pub chunk_id: u32,
    pub text: String,
    pub vector: Vec<f32>,
    pub created_at: String,
}

/// Operations every document store backend must provide.
///
/// Write operations are atomic at the granularity of a single call; callers
/// serialize ingestion passes rather than relying on store-level locking.
pub trait DocumentStore: Send + Sync {
    fn index_exists(&self) -> Result<bool>;

    /// Create the index. A no-op (logged) when the index already exists.
    fn create_index(&self) -> Result<()>;

    /// Drop the index and every record in it. A no-op (logged) when the
    /// index does not exist.
    fn drop_index(&self) -> Result<()>;

    /// True iff at least one record carries this document id.
    fn document_exists(&self, document_id: &str) -> Result<bool>;

    /// Remove all records for a document id. A no-op (logged) when none exist.
    fn delete_document(&self, document_id: &str) -> Result<()>;

    /// Write one record per (chunk, vector) pair, tagged with the document id
    /// and the chunk's position. Skipped entirely (logged) when the document
    /// already exists; new records are searchable once this call returns.
    fn upsert_chunks(&self, document_id: &str, chunks: &[String], vectors: &[Vec<f32>])
    -> Result<()>;

    /// Top-N chunk texts ranked by a lexical match on `query_text` combined
    /// with `cosine(query_vector, vector) + 1.0`, highest score first.
    fn search(&self, query_text: &str, query_vector: &[f32], top_n: usize) -> Result<Vec<String>>;

    /// Distinct document ids, bounded by [`MAX_LIST_SCAN`] records.
    fn list_document_ids(&self) -> Result<Vec<String>>;

    /// Make pending writes visible to subsequent searches.
    fn refresh(&self) -> Result<()>;
}
