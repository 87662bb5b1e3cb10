use super::*;
use crate::config::{Config, KnowledgeConfig};
use crate::documents::Document;
use crate::index::Indexer;
use crate::llm::testing::HashEmbedder;
use std::path::PathBuf;
use tempfile::TempDir;

async fn retriever(temp_dir: &TempDir, embedder: HashEmbedder) -> Retriever {
    let config = Config {
        knowledge: KnowledgeConfig {
            docs_dir: temp_dir.path().join("docs"),
            index_dir: None,
        },
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let documents = [
        ("k2.pdf", "K2Drops deliver vitamin K2 for bone and heart health."),
        ("fibre.pdf", "Fibre Feel is a gentle prebiotic fibre for digestion."),
        ("elder.pdf", "ElderC Liquid combines elderberry and vitamin C for immunity."),
    ]
    .into_iter()
    .map(|(name, text)| Document {
        source: PathBuf::from(name),
        page_number: 1,
        text: text.to_string(),
    })
    .collect::<Vec<_>>();

    let knowledge_base = Indexer::new(&config, Arc::new(HashEmbedder::default()))
        .build(&documents)
        .await
        .expect("build should succeed");
    Retriever::new(Arc::new(knowledge_base), Arc::new(embedder))
}

#[tokio::test]
async fn returns_nearest_chunks_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let retriever = retriever(&temp_dir, HashEmbedder::default()).await;

    let chunks = retriever
        .top_k("prebiotic fibre for digestion", 2)
        .await
        .expect("retrieval should succeed");

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].source, "fibre.pdf");
    assert_eq!(chunks[0].page_number, 1);
}

#[tokio::test]
async fn large_k_returns_whole_corpus() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let retriever = retriever(&temp_dir, HashEmbedder::default()).await;

    let chunks = retriever
        .top_k("vitamin", 10)
        .await
        .expect("retrieval should succeed");
    assert_eq!(chunks.len(), 3);

    assert!(
        retriever
            .top_k("vitamin", 0)
            .await
            .expect("retrieval should succeed")
            .is_empty()
    );
}

#[tokio::test]
async fn embedding_failure_is_reported() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let retriever = retriever(&temp_dir, HashEmbedder { fail: true }).await;

    let result = retriever.top_k("vitamin", 2).await;
    assert!(matches!(result, Err(RagError::Embedding(_))));
}
