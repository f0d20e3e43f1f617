use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShelfError>;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Text extraction error: {0}")]
    Extraction(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod ingest;
pub mod retrieval;
pub mod store;
pub mod watcher;
