use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod rerank;
pub mod search;
pub mod store;
