//! Persisted vector index over the PDF corpus.
//!
//! Layout under the index directory:
//!
//! ```text
//! CURRENT                      name of the live generation
//! generations/<name>/          complete LanceDB database + manifest.json
//! generations/<name>.partial/  build in progress
//! ```
//!
//! A build writes a fresh generation next to the live one, renames it into
//! place and then swaps `CURRENT` with a rename, so readers only ever open
//! complete generations. The generation before the live one is kept for
//! readers still holding it; older ones are pruned.

pub mod vector_store;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::documents::{self, Document};
use crate::embeddings::chunking::{Chunk, ChunkingConfig, chunk_documents};
use crate::llm::EmbeddingModel;
use crate::{RagError, Result};
pub use vector_store::{SearchResult, VectorStore};

const CURRENT_FILE: &str = "CURRENT";
const GENERATIONS_DIR: &str = "generations";
const MANIFEST_FILE: &str = "manifest.json";
const PARTIAL_SUFFIX: &str = ".partial";
/// Idle time after which a partial build counts as abandoned
const STALE_PARTIAL_AGE: Duration = Duration::from_secs(60 * 60);

/// Facts about one generation, written next to its database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: String,
    pub created_at: DateTime<Utc>,
    pub source_files: Vec<String>,
    pub page_count: usize,
    pub chunk_count: usize,
    pub vector_dimension: usize,
}

/// An open, immutable generation of the index
pub struct KnowledgeBase {
    store: VectorStore,
    manifest: Manifest,
    path: PathBuf,
}

impl KnowledgeBase {
    #[inline]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Nearest chunks to an already embedded query
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.store.search(query_vector, limit).await
    }
}

/// What `status` reports about the index directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatus {
    pub index_dir: PathBuf,
    pub live: Option<Manifest>,
    pub generations: Vec<String>,
}

impl IndexStatus {
    /// Inspect `index_dir` without opening any database
    #[inline]
    pub fn read(index_dir: &Path) -> Result<Self> {
        let live = match read_current(index_dir)? {
            Some(generation) => {
                read_manifest(&index_dir.join(GENERATIONS_DIR).join(generation)).ok()
            }
            None => None,
        };

        Ok(Self {
            index_dir: index_dir.to_path_buf(),
            live,
            generations: list_generations(index_dir)?,
        })
    }
}

/// Builds, loads and swaps knowledge base generations
pub struct Indexer {
    index_dir: PathBuf,
    docs_dir: PathBuf,
    chunking: ChunkingConfig,
    fallback_dimension: usize,
    embedder: Arc<dyn EmbeddingModel>,
}

impl Indexer {
    #[inline]
    pub fn new(config: &Config, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            index_dir: config.index_dir(),
            docs_dir: config.docs_dir().to_path_buf(),
            chunking: config.chunking.clone(),
            fallback_dimension: config.api.embedding_dimension as usize,
            embedder,
        }
    }

    #[inline]
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    #[inline]
    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Chunk and embed `documents` into a new generation and make it live
    #[inline]
    pub async fn build(&self, documents: &[Document]) -> Result<KnowledgeBase> {
        let chunks = chunk_documents(documents, &self.chunking);
        info!(
            "Building knowledge base from {} pages ({} chunks)",
            documents.len(),
            chunks.len()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = Arc::clone(&self.embedder);
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_documents(&texts))
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut source_files: Vec<String> = documents
            .iter()
            .map(|d| d.source.display().to_string())
            .collect();
        source_files.dedup();

        let generation = new_generation_name();
        let manifest = Manifest {
            generation: generation.clone(),
            created_at: Utc::now(),
            source_files,
            page_count: documents.len(),
            chunk_count: chunks.len(),
            vector_dimension: vectors.first().map_or(self.fallback_dimension, Vec::len),
        };

        let generations_dir = self.index_dir.join(GENERATIONS_DIR);
        let partial_path = generations_dir.join(format!("{generation}{PARTIAL_SUFFIX}"));
        fs::create_dir_all(&generations_dir)?;

        if let Err(e) = self
            .write_generation(&partial_path, &manifest, &chunks, &vectors)
            .await
        {
            if partial_path.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&partial_path) {
                    warn!(
                        "Failed to remove partial generation {}: {}",
                        partial_path.display(),
                        cleanup
                    );
                }
            }
            return Err(e);
        }

        self.write_current(&generation)?;
        info!("Generation {} is now live", generation);

        if let Err(e) = self.prune() {
            warn!("Failed to prune old generations: {}", e);
        }

        self.open_generation(&generation).await
    }

    /// Fill `partial_path`, then rename it to its final generation name
    async fn write_generation(
        &self,
        partial_path: &Path,
        manifest: &Manifest,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        {
            let mut store = VectorStore::create(partial_path, manifest.vector_dimension).await?;
            store.add_chunks(chunks, vectors).await?;
        }

        let manifest_json = serde_json::to_string_pretty(manifest)
            .map_err(|e| RagError::Index(format!("Failed to serialize manifest: {}", e)))?;
        fs::write(partial_path.join(MANIFEST_FILE), manifest_json)?;

        fs::rename(partial_path, self.generation_path(&manifest.generation)).map_err(|e| {
            RagError::Index(format!(
                "Failed to finalize generation {}: {}",
                manifest.generation, e
            ))
        })?;
        Ok(())
    }

    /// Load the corpus from disk and build a new generation from it
    #[inline]
    pub async fn rebuild(&self) -> Result<KnowledgeBase> {
        let docs_dir = self.docs_dir.clone();
        let documents = tokio::task::spawn_blocking(move || documents::load_directory(&docs_dir))
            .await
            .map_err(|e| RagError::Document(format!("Document loading task failed: {}", e)))??;

        self.build(&documents).await
    }

    /// Open the live generation, or `None` when it is absent or unreadable
    #[inline]
    pub async fn load(&self) -> Option<KnowledgeBase> {
        let generation = match read_current(&self.index_dir) {
            Ok(Some(generation)) => generation,
            Ok(None) => {
                debug!("No live generation in {}", self.index_dir.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read live generation marker: {}", e);
                return None;
            }
        };

        match self.open_generation(&generation).await {
            Ok(knowledge_base) => Some(knowledge_base),
            Err(e) => {
                warn!("Index generation {} is unreadable: {}", generation, e);
                None
            }
        }
    }

    /// The live generation if readable, otherwise a fresh build
    #[inline]
    pub async fn load_or_build(&self) -> Result<KnowledgeBase> {
        if let Some(knowledge_base) = self.load().await {
            return Ok(knowledge_base);
        }

        info!("No usable index found, building one");
        self.rebuild().await
    }

    #[inline]
    pub fn status(&self) -> Result<IndexStatus> {
        IndexStatus::read(&self.index_dir)
    }

    fn generation_path(&self, generation: &str) -> PathBuf {
        self.index_dir.join(GENERATIONS_DIR).join(generation)
    }

    async fn open_generation(&self, generation: &str) -> Result<KnowledgeBase> {
        let path = self.generation_path(generation);
        let manifest = read_manifest(&path)?;
        let store = VectorStore::open(&path).await?;

        if store.len() != manifest.chunk_count {
            return Err(RagError::Index(format!(
                "Generation {} holds {} chunks, manifest records {}",
                generation,
                store.len(),
                manifest.chunk_count
            )));
        }

        Ok(KnowledgeBase {
            store,
            manifest,
            path,
        })
    }

    /// Replace `CURRENT` with a rename so readers never see a torn write
    fn write_current(&self, generation: &str) -> Result<()> {
        let temp_path = self
            .index_dir
            .join(format!("{CURRENT_FILE}.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&temp_path, format!("{generation}\n"))?;
        fs::rename(&temp_path, self.index_dir.join(CURRENT_FILE))?;
        Ok(())
    }

    /// Keep the live generation and the one before it. A partial build is
    /// only removed once it is older than the oldest kept generation and
    /// has not been written to for [`STALE_PARTIAL_AGE`]. Younger partials
    /// may belong to a rebuild still in progress.
    fn prune(&self) -> Result<()> {
        let Some(current) = read_current(&self.index_dir)? else {
            return Ok(());
        };

        let generations = list_generations(&self.index_dir)?;
        let Some(position) = generations.iter().position(|g| *g == current) else {
            return Ok(());
        };
        let keep_from = position.saturating_sub(1);
        let oldest_kept = generations.get(keep_from).cloned().unwrap_or(current);

        for entry in fs::read_dir(self.index_dir.join(GENERATIONS_DIR))? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let (stem, partial) = match name.strip_suffix(PARTIAL_SUFFIX) {
                Some(stem) => (stem, true),
                None => (name.as_str(), false),
            };
            if stem >= oldest_kept.as_str() || (partial && !is_stale(&entry.path())) {
                continue;
            }
            debug!("Pruning index generation {}", name);
            fs::remove_dir_all(entry.path())?;
        }

        Ok(())
    }
}

/// Sortable by creation time, unique across concurrent builds
fn new_generation_name() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}",
        Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
        suffix.get(..8).unwrap_or(&suffix)
    )
}

/// Whether `path` was last modified more than [`STALE_PARTIAL_AGE`] ago
fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|idle| idle > STALE_PARTIAL_AGE)
}

fn read_current(index_dir: &Path) -> Result<Option<String>> {
    match fs::read_to_string(index_dir.join(CURRENT_FILE)) {
        Ok(content) => {
            let generation = content.trim();
            Ok((!generation.is_empty()).then(|| generation.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Completed generation names, oldest first
fn list_generations(index_dir: &Path) -> Result<Vec<String>> {
    let dir = index_dir.join(GENERATIONS_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut generations = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if !name.ends_with(PARTIAL_SUFFIX) => {
                generations.push(name.to_string());
            }
            _ => {}
        }
    }
    generations.sort();
    Ok(generations)
}

fn read_manifest(generation_path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(generation_path.join(MANIFEST_FILE)).map_err(|e| {
        RagError::Index(format!(
            "Failed to read manifest in {}: {}",
            generation_path.display(),
            e
        ))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| RagError::Index(format!("Failed to parse manifest: {}", e)))
}
