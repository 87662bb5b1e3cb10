
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{ChatMessage, ChatModel, ChatRequest, EmbeddingModel, ImageModel};
use crate::config::{ApiConfig, ApiFlavor};

/// Client for OpenAI-compatible REST APIs, including Azure OpenAI deployments
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    flavor: ApiFlavor,
    api_version: Option<String>,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    image_model: String,
    batch_size: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiClient {
    /// Build a client from the `[api]` settings, reading the key from the
    /// configured environment variable
    #[inline]
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let base_url = api.base_url().context("Failed to parse API base URL")?;

        let api_key = api.api_key();
        if api_key.is_none() {
            warn!(
                "Environment variable {} is not set, requests will be sent without credentials",
                api.api_key_env
            );
        }

        Ok(Self {
            base_url,
            flavor: api.flavor,
            api_version: api.api_version.clone(),
            api_key,
            chat_model: api.chat_model.clone(),
            embedding_model: api.embedding_model.clone(),
            image_model: api.image_model.clone(),
            batch_size: api.embedding_batch_size.max(1),
            agent: build_agent(Duration::from_secs(api.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// Route for an operation such as `chat/completions`
    fn endpoint(&self, operation: &str, model: &str) -> Result<Url> {
        match self.flavor {
            ApiFlavor::OpenAi => self
                .base_url
                .join(operation)
                .with_context(|| format!("Failed to build URL for {operation}")),
            ApiFlavor::Azure => {
                let mut url = self
                    .base_url
                    .join(&format!("openai/deployments/{model}/{operation}"))
                    .with_context(|| format!("Failed to build URL for {operation}"))?;
                if let Some(version) = &self.api_version {
                    url.query_pairs_mut().append_pair("api-version", version);
                }
                Ok(url)
            }
        }
    }

    fn post_json(&self, url: &Url, body: &Value) -> Result<String> {
        let request_json = serde_json::to_string(body).context("Failed to serialize request")?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = match self.flavor {
                ApiFlavor::OpenAi => request.header("Authorization", &format!("Bearer {key}")),
                ApiFlavor::Azure => request.header("api-key", key),
            };
        }

        let mut response = request
            .send(&request_json)
            .with_context(|| format!("Request to {} failed", url.path()))?;

        let status = response.status();
        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read response body")?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map_or_else(|_| text.clone(), |e| e.error.message);
            return Err(anyhow!(
                "API error: HTTP {} from {}: {}",
                status.as_u16(),
                url.path(),
                message
            ));
        }

        Ok(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint("embeddings", &self.embedding_model)?;
        let body = json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let response_text = self
            .post_json(&url, &body)
            .context("Failed to generate embeddings")?;
        let mut response: EmbeddingResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embedding response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

impl EmbeddingModel for OpenAiClient {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let batch_embeddings = self
                .embed_batch(batch)
                .with_context(|| format!("Failed to process batch of {} texts", batch.len()))?;
            embeddings.extend(batch_embeddings);
        }

        debug!("Generated {} embeddings total", embeddings.len());
        Ok(embeddings)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Embedding response was empty"))
    }
}

impl ChatModel for OpenAiClient {
    #[inline]
    fn complete(&self, request: &ChatRequest) -> Result<ChatMessage> {
        let url = self.endpoint("chat/completions", &self.chat_model)?;

        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
        });
        if !request.tools.is_empty() {
            body["tools"] = request.tools.iter().map(|t| t.to_json()).collect();
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let response_text = self
            .post_json(&url, &body)
            .context("Chat completion failed")?;
        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Chat completion returned no choices"))?;

        debug!(
            "Chat completion finished ({}), {} tool calls",
            choice.finish_reason.as_deref().unwrap_or("unknown"),
            choice.message.tool_calls.len()
        );

        Ok(choice.message)
    }
}

impl ImageModel for OpenAiClient {
    #[inline]
    fn generate_image(&self, prompt: &str, size: &str) -> Result<String> {
        let url = self.endpoint("images/generations", &self.image_model)?;
        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "size": size,
            "n": 1,
        });

        let response_text = self
            .post_json(&url, &body)
            .context("Image generation failed")?;
        let response: ImageResponse = serde_json::from_str(&response_text)
            .context("Failed to parse image generation response")?;

        response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| anyhow!("Image generation returned no URL"))
    }
}
