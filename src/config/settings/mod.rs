#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::catalog::Catalog;
use crate::embeddings::chunking::ChunkingConfig;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
const APP_DIR_NAME: &str = "recipe-rag";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Which route layout and auth header the model API expects
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
    #[default]
    OpenAi,
    Azure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub flavor: ApiFlavor,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Required for the Azure flavor
    pub api_version: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub image_model: String,
    pub image_size: String,
    pub embedding_batch_size: u32,
    pub embedding_dimension: u32,
    pub answer_temperature: f32,
    pub suggestion_temperature: f32,
    pub suggestion_max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            flavor: ApiFlavor::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_version: None,
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            embedding_batch_size: 64,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            answer_temperature: 0.1,
            suggestion_temperature: 0.3,
            suggestion_max_tokens: 150,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks handed to the model per retrieval tool call
    pub top_k: usize,
    pub max_agent_iterations: usize,
    pub min_suggestion_chars: usize,
    pub suggestion_count: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_agent_iterations: 15,
            min_suggestion_chars: 3,
            suggestion_count: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory of source PDFs, relative paths resolve against the working directory
    pub docs_dir: PathBuf,
    /// Defaults to `<base_dir>/index`
    pub index_dir: Option<PathBuf>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            index_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid API key variable: {0} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Azure flavor requires an api_version")]
    MissingApiVersion,
    #[error("Invalid image size: {0} (expected WIDTHxHEIGHT)")]
    InvalidImageSize(String),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid max tokens: {0} (must be between 1 and 4096)")]
    InvalidMaxTokens(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid chunk size: {0} (must be between 100 and 8000 characters)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid agent iteration cap: {0} (must be between 1 and 50)")]
    InvalidIterations(usize),
    #[error("Invalid suggestion settings: min chars {0}, count {1}")]
    InvalidSuggestionSettings(usize, usize),
    #[error("Catalog must contain at least one product")]
    EmptyCatalog,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default application directory, e.g. `~/.config/recipe-rag`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.validate_chunking_config()?;
        self.validate_retrieval_config()?;
        if self.catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(100..=8000).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                config.chunk_overlap,
                config.chunk_size,
            ));
        }

        Ok(())
    }

    fn validate_retrieval_config(&self) -> Result<(), ConfigError> {
        let config = &self.retrieval;

        if !(1..=50).contains(&config.top_k) {
            return Err(ConfigError::InvalidTopK(config.top_k));
        }

        if !(1..=50).contains(&config.max_agent_iterations) {
            return Err(ConfigError::InvalidIterations(config.max_agent_iterations));
        }

        if config.min_suggestion_chars == 0 || !(1..=10).contains(&config.suggestion_count) {
            return Err(ConfigError::InvalidSuggestionSettings(
                config.min_suggestion_chars,
                config.suggestion_count,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Root directory of the persisted vector index
    #[inline]
    pub fn index_dir(&self) -> PathBuf {
        self.knowledge
            .index_dir
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("index"))
    }

    #[inline]
    pub fn docs_dir(&self) -> &Path {
        &self.knowledge.docs_dir
    }

    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        self.api.base_url()
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(self.base_url.clone()));
        }

        for model in [&self.chat_model, &self.embedding_model, &self.image_model] {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(model.clone()));
            }
        }

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        if self.flavor == ApiFlavor::Azure
            && self.api_version.as_deref().is_none_or(|v| v.trim().is_empty())
        {
            return Err(ConfigError::MissingApiVersion);
        }

        if parse_image_size(&self.image_size).is_none() {
            return Err(ConfigError::InvalidImageSize(self.image_size.clone()));
        }

        if !(1..=2048).contains(&self.embedding_batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.embedding_batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        for temperature in [self.answer_temperature, self.suggestion_temperature] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidTemperature(temperature));
            }
        }

        if !(1..=4096).contains(&self.suggestion_max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.suggestion_max_tokens));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    /// Base URL with a trailing slash so that `Url::join` appends path segments
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        Url::parse(&format!("{}/", trimmed))
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        let temp_config = ApiConfig {
            base_url: base_url.clone(),
            ..self.clone()
        };
        temp_config.base_url()?;
        self.base_url = base_url;
        Ok(())
    }

    pub fn set_flavor(&mut self, flavor: ApiFlavor, api_version: Option<String>) {
        self.flavor = flavor;
        self.api_version = api_version.filter(|v| !v.trim().is_empty());
    }

    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    pub fn set_image_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.image_model = model;
        Ok(())
    }

    pub fn set_api_key_env(&mut self, name: String) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(name));
        }
        self.api_key_env = name;
        Ok(())
    }

    pub fn set_embedding_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if !(1..=2048).contains(&batch_size) {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.embedding_batch_size = batch_size;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

/// Parse `WIDTHxHEIGHT`
pub(crate) fn parse_image_size(size: &str) -> Option<(u32, u32)> {
    let (width, height) = size.split_once('x')?;
    let width = width.trim().parse::<u32>().ok()?;
    let height = height.trim().parse::<u32>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}
