use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod agent;
pub mod assistant;
pub mod autocomplete;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod recipe;
pub mod retrieval;
pub mod session;

#[cfg(feature = "bench")]
pub mod internal {
    pub use crate::embeddings::chunking;
}
