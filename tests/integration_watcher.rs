#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use docshelf::embeddings::EmbeddingProvider;
use docshelf::embeddings::chunking::ChunkingConfig;
use docshelf::extract::TextExtractor;
use docshelf::ingest::IngestionPipeline;
use docshelf::store::{DocumentStore, MemoryStore};
use docshelf::watcher::DirectoryWatcher;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Deterministic embedder keyed on text length, no network involved.
struct StubEmbedder;

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let len = text.chars().count() as f32;
        Ok(vec![len, 1.0, 0.0])
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Reads files as UTF-8, standing in for real PDF parsing.
struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn spawn_watcher(store: &Arc<MemoryStore>, data_dir: &Path) -> tokio::task::JoinHandle<()> {
    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(store) as Arc<dyn DocumentStore>,
        Arc::new(StubEmbedder),
        Arc::new(PlainTextExtractor),
        ChunkingConfig {
            chunk_size: 80,
            chunk_overlap: 10,
        },
    ));
    let watcher = DirectoryWatcher::new(pipeline, data_dir.to_path_buf(), DEBOUNCE);

    tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            panic!("watcher stopped with an error: {:#}", e);
        }
    })
}

/// Poll until the condition holds, or fail after a generous deadline.
async fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {}", what);
}

#[tokio::test(flavor = "multi_thread")]
async fn startup_pass_ingests_existing_files() {
    let data_dir = TempDir::new().expect("should create TempDir");
    std::fs::write(
        data_dir.path().join("manual.pdf"),
        "Splits allow dividing work items.",
    )
    .expect("should write file");

    let store = Arc::new(MemoryStore::new());
    let handle = spawn_watcher(&store, data_dir.path());

    let probe = Arc::clone(&store);
    wait_for("the startup pass to index manual", move || {
        probe.document_exists("manual").expect("document_exists")
    })
    .await;

    handle.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn file_added_while_watching_is_ingested_after_the_debounce() {
    let data_dir = TempDir::new().expect("should create TempDir");

    let store = Arc::new(MemoryStore::new());
    let handle = spawn_watcher(&store, data_dir.path());

    // Let the startup pass finish over the empty directory first
    tokio::time::sleep(DEBOUNCE).await;
    assert!(!store.document_exists("manual").expect("document_exists"));

    std::fs::write(
        data_dir.path().join("manual.pdf"),
        "Splits allow dividing work items.",
    )
    .expect("should write file");

    let probe = Arc::clone(&store);
    wait_for("the debounced pass to index manual", move || {
        probe.document_exists("manual").expect("document_exists")
    })
    .await;

    handle.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn removing_a_file_while_watching_removes_its_records() {
    let data_dir = TempDir::new().expect("should create TempDir");
    std::fs::write(
        data_dir.path().join("manual.pdf"),
        "Splits allow dividing work items.",
    )
    .expect("should write file");
    std::fs::write(
        data_dir.path().join("billing.pdf"),
        "An invoice is generated from estimates.",
    )
    .expect("should write file");

    let store = Arc::new(MemoryStore::new());
    let handle = spawn_watcher(&store, data_dir.path());

    let probe = Arc::clone(&store);
    wait_for("the startup pass to index both documents", move || {
        probe.document_exists("manual").expect("document_exists")
            && probe.document_exists("billing").expect("document_exists")
    })
    .await;

    std::fs::remove_file(data_dir.path().join("billing.pdf")).expect("should remove file");

    let probe = Arc::clone(&store);
    wait_for("the debounced pass to drop billing", move || {
        !probe.document_exists("billing").expect("document_exists")
    })
    .await;
    assert!(store.document_exists("manual").expect("document_exists"));

    handle.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn non_pdf_churn_does_not_trigger_ingestion() {
    let data_dir = TempDir::new().expect("should create TempDir");

    let store = Arc::new(MemoryStore::new());
    let handle = spawn_watcher(&store, data_dir.path());

    tokio::time::sleep(DEBOUNCE).await;

    std::fs::write(data_dir.path().join("notes.txt"), "not a pdf").expect("should write file");
    std::fs::write(data_dir.path().join("manual.pdf.tmp"), "partial upload")
        .expect("should write file");

    // Give any mistaken pass ample time to run
    tokio::time::sleep(DEBOUNCE * 4).await;
    assert!(
        store
            .list_document_ids()
            .expect("list_document_ids")
            .is_empty()
    );

    handle.abort();
}
