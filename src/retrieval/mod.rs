#[cfg(test)]
mod tests;

use std::sync::Arc;
use tracing::debug;

use crate::embeddings::chunking::Chunk;
use crate::index::KnowledgeBase;
use crate::llm::EmbeddingModel;
use crate::{RagError, Result};

/// Embeds queries with the model that built the index and returns the
/// nearest chunks
#[derive(Clone)]
pub struct Retriever {
    knowledge_base: Arc<KnowledgeBase>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl Retriever {
    #[inline]
    pub fn new(knowledge_base: Arc<KnowledgeBase>, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            knowledge_base,
            embedder,
        }
    }

    #[inline]
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// The `k` chunks closest to `query`, nearest first. Every chunk is
    /// returned when `k` exceeds the corpus size.
    #[inline]
    pub async fn top_k(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let query_vector = tokio::task::spawn_blocking(move || embedder.embed_query(&text))
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let results = self.knowledge_base.search(&query_vector, k).await?;
        debug!("Retrieved {} chunks for query '{}'", results.len(), query);

        Ok(results.into_iter().map(|r| r.chunk).collect())
    }
}
