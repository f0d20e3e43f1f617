
use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::ShelfError;
use crate::config::ElasticsearchConfig;
use crate::store::{DocumentStore, IndexRecord, MAX_LIST_SCAN};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Document store backed by an Elasticsearch index over HTTP.
///
/// One index holds the chunks of every document; records are tagged with
/// their document id so existence checks and deletes are term queries.
#[derive(Debug, Clone)]
pub struct ElasticStore {
    base_url: Url,
    index: String,
    dimension: usize,
    agent: ureq::Agent,
    auth_header: Option<String>,
}

impl ElasticStore {
    /// Connect to the cluster and verify it is reachable.
    ///
    /// An unreachable store is fatal to the caller; nothing can be ingested
    /// or searched without it, so the failure surfaces here instead of on
    /// first use.
    #[inline]
    pub fn connect(config: &ElasticsearchConfig, dimension: usize) -> Result<Self> {
        let base_url = config
            .url()
            .context("Failed to generate Elasticsearch URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        let auth_header = match (&config.username, &config.password) {
            (Some(user), Some(password)) => Some(format!(
                "Basic {}",
                BASE64.encode(format!("{}:{}", user, password))
            )),
            _ => None,
        };

        let store = Self {
            base_url,
            index: config.index.clone(),
            dimension,
            agent,
            auth_header,
        };

        store.ping()?;
        info!("Connected to Elasticsearch at {}", store.base_url);

        Ok(store)
    }

    /// Check that the cluster answers at all.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        self.agent
            .get(self.base_url.as_str())
            .with_auth(self.auth_header.as_deref())
            .call()
            .map_err(|e| {
                ShelfError::Store(format!(
                    "Failed to connect to Elasticsearch at {}: {}",
                    self.base_url, e
                ))
            })?;
        Ok(())
    }

    fn index_url(&self, suffix: &str) -> Result<Url> {
        self.base_url
            .join(&format!("/{}{}", self.index, suffix))
            .context("Failed to build index URL")
    }

    /// POST a JSON body; `Ok(None)` means the target does not exist (404).
    fn post_json(&self, url: &Url, body: &Value) -> Result<Option<Value>> {
        let result = self
            .agent
            .post(url.as_str())
            .with_auth(self.auth_header.as_deref())
            .header("Content-Type", "application/json")
            .send(&body.to_string())
            .and_then(|mut resp| resp.body_mut().read_to_string());

        Self::parse_response(url, result)
    }

    fn post_ndjson(&self, url: &Url, body: &str) -> Result<Option<Value>> {
        let result = self
            .agent
            .post(url.as_str())
            .with_auth(self.auth_header.as_deref())
            .header("Content-Type", "application/x-ndjson")
            .send(body)
            .and_then(|mut resp| resp.body_mut().read_to_string());

        Self::parse_response(url, result)
    }

    fn put_json(&self, url: &Url, body: &Value) -> Result<Option<Value>> {
        let result = self
            .agent
            .put(url.as_str())
            .with_auth(self.auth_header.as_deref())
            .header("Content-Type", "application/json")
            .send(&body.to_string())
            .and_then(|mut resp| resp.body_mut().read_to_string());

        Self::parse_response(url, result)
    }

    fn delete(&self, url: &Url) -> Result<Option<Value>> {
        let result = self
            .agent
            .delete(url.as_str())
            .with_auth(self.auth_header.as_deref())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string());

        Self::parse_response(url, result)
    }

    fn parse_response(
        url: &Url,
        result: std::result::Result<String, ureq::Error>,
    ) -> Result<Option<Value>> {
        match result {
            Ok(text) => {
                let value = serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse response from {}", url))?;
                Ok(Some(value))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(ShelfError::Store(format!("Request to {} failed: {}", url, e)).into()),
        }
    }
}

/// Attach the optional basic-auth header without branching at every call site.
trait WithAuth {
    fn with_auth(self, auth: Option<&str>) -> Self;
}

impl<B> WithAuth for ureq::RequestBuilder<B> {
    fn with_auth(self, auth: Option<&str>) -> Self {
        match auth {
            Some(value) => self.header("Authorization", value),
            None => self,
        }
    }
}

impl DocumentStore for ElasticStore {
    #[inline]
    fn index_exists(&self) -> Result<bool> {
        let url = self.index_url("")?;
        match self
            .agent
            .head(url.as_str())
            .with_auth(self.auth_header.as_deref())
            .call()
        {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(e) => Err(ShelfError::Store(format!("Request to {} failed: {}", url, e)).into()),
        }
    }

    #[inline]
    fn create_index(&self) -> Result<()> {
        if self.index_exists()? {
            info!("Index {} already exists", self.index);
            return Ok(());
        }

        let mappings = json!({
            "mappings": {
                "properties": {
                    "document_id": {"type": "keyword"},
                    "chunk_id": {"type": "integer"},
                    "text": {"type": "text"},
                    "vector": {"type": "dense_vector", "dims": self.dimension}
                }
            }
        });

        let url = self.index_url("")?;
        self.put_json(&url, &mappings)?
            .ok_or_else(|| ShelfError::Store(format!("Failed to create index {}", self.index)))?;

        info!("Index {} created", self.index);
        Ok(())
    }

    #[inline]
    fn drop_index(&self) -> Result<()> {
        let url = self.index_url("")?;
        match self.delete(&url)? {
            Some(_) => info!("Index {} deleted", self.index),
            None => info!("Index {} does not exist, nothing to delete", self.index),
        }
        Ok(())
    }

    #[inline]
    fn document_exists(&self, document_id: &str) -> Result<bool> {
        let url = self.index_url("/_count")?;
        let body = json!({"query": {"term": {"document_id": document_id}}});

        match self.post_json(&url, &body)? {
            Some(response) => Ok(response["count"].as_u64().unwrap_or(0) > 0),
            None => Ok(false),
        }
    }

    #[inline]
    fn delete_document(&self, document_id: &str) -> Result<()> {
        if !self.document_exists(document_id)? {
            info!("Document {} not found in index, nothing to delete", document_id);
            return Ok(());
        }

        let url = self.index_url("/_delete_by_query")?;
        let body = json!({"query": {"term": {"document_id": document_id}}});
        self.post_json(&url, &body)?;
        self.refresh()?;

        info!("Deleted document {} from index", document_id);
        Ok(())
    }

    #[inline]
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

        if self.document_exists(document_id)? {
            info!("Document {} already exists. Skipping indexing.", document_id);
            return Ok(());
        }

        if chunks.is_empty() {
            debug!("No chunks to index for {}", document_id);
            return Ok(());
        }

        let created_at = Utc::now().to_rfc3339();
        let mut body = String::new();
        for (i, (chunk, vector)) in chunks.iter().zip(vectors.iter()).enumerate() {
            let record = IndexRecord {
                document_id: document_id.to_string(),
                chunk_id: u32::try_from(i).context("chunk index out of range")?,
                text: chunk.clone(),
                vector: vector.clone(),
                created_at: created_at.clone(),
            };

            body.push_str(&json!({"index": {"_index": self.index}}).to_string());
            body.push('\n');
            body.push_str(&serde_json::to_string(&record).context("Failed to serialize record")?);
            body.push('\n');
        }

        let url = self
            .base_url
            .join("/_bulk")
            .context("Failed to build bulk URL")?;
        let response = self
            .post_ndjson(&url, &body)?
            .ok_or_else(|| ShelfError::Store("Bulk endpoint not found".to_string()))?;

        if response["errors"].as_bool() == Some(true) {
            return Err(ShelfError::Store(format!(
                "Bulk indexing reported item failures for document {}",
                document_id
            ))
            .into());
        }

        // Make the new records searchable before returning
        self.refresh()?;

        info!("Indexed document {} with {} chunks", document_id, chunks.len());
        Ok(())
    }

    #[inline]
    fn search(&self, query_text: &str, query_vector: &[f32], top_n: usize) -> Result<Vec<String>> {
        let url = self.index_url("/_search")?;
        let body = json!({
            "size": top_n,
            "query": {
                "script_score": {
                    "query": {"match": {"text": query_text}},
                    "script": {
                        "source": "cosineSimilarity(params.query_vector, 'vector') + 1.0",
                        "params": {"query_vector": query_vector}
                    }
                }
            }
        });

        let Some(response) = self.post_json(&url, &body)? else {
            warn!("Index {} does not exist, returning no results", self.index);
            return Ok(Vec::new());
        };

        let hits = response["hits"]["hits"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(hits
            .iter()
            .filter_map(|hit| hit["_source"]["text"].as_str().map(str::to_string))
            .collect())
    }

    #[inline]
    fn list_document_ids(&self) -> Result<Vec<String>> {
        let url = self.index_url("/_search")?;
        let body = json!({
            "size": MAX_LIST_SCAN,
            "_source": ["document_id"],
            "query": {"match_all": {}}
        });

        let Some(response) = self.post_json(&url, &body)? else {
            return Ok(Vec::new());
        };

        let hits = response["hits"]["hits"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut ids = Vec::new();
        for hit in &hits {
            if let Some(id) = hit["_source"]["document_id"].as_str() {
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            }
        }

        Ok(ids)
    }

    #[inline]
    fn refresh(&self) -> Result<()> {
        let url = self.index_url("/_refresh")?;
        self.post_json(&url, &json!({}))?;
        Ok(())
    }
}
