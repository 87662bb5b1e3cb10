//! Turning page text into embeddable chunks

pub mod chunking;

pub use chunking::{Chunk, ChunkingConfig, chunk_document, chunk_documents, split_text};
