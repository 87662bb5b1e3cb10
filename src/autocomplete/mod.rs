//! Search box suggestions, cached per session by exact partial query

#[cfg(test)]
mod tests;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::agent::prompt;
use crate::config::Config;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};

/// How suggestions are requested
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionSettings {
    pub brand: String,
    /// Partial queries shorter than this many characters get no suggestions
    pub min_chars: usize,
    pub count: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SuggestionSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            brand: config.catalog.brand.clone(),
            min_chars: config.retrieval.min_suggestion_chars,
            count: config.retrieval.suggestion_count,
            temperature: config.api.suggestion_temperature,
            max_tokens: config.api.suggestion_max_tokens,
        }
    }
}

impl Default for SuggestionSettings {
    #[inline]
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Partial query to suggestions. Entries live as long as the session and
/// failed lookups are cached as empty lists.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SuggestionCache {
    entries: HashMap<String, Vec<String>>,
}

impl SuggestionCache {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, partial: &str) -> Option<&[String]> {
        self.entries.get(partial).map(Vec::as_slice)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Suggestions completing `partial`. Never fails: anything that goes
    /// wrong yields an empty list.
    #[inline]
    pub async fn suggest(
        &mut self,
        partial: &str,
        chat: &Arc<dyn ChatModel>,
        settings: &SuggestionSettings,
    ) -> Vec<String> {
        if partial.chars().count() < settings.min_chars {
            return Vec::new();
        }
        if let Some(cached) = self.entries.get(partial) {
            debug!("Suggestion cache hit for '{}'", partial);
            return cached.clone();
        }

        let suggestions = match request_suggestions(partial, chat, settings).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("Suggestion error: {:#}", e);
                Vec::new()
            }
        };

        self.entries
            .insert(partial.to_string(), suggestions.clone());
        suggestions
    }
}

async fn request_suggestions(
    partial: &str,
    chat: &Arc<dyn ChatModel>,
    settings: &SuggestionSettings,
) -> anyhow::Result<Vec<String>> {
    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(prompt::suggestion_system(&settings.brand)),
            ChatMessage::user(prompt::suggestion_user(
                &settings.brand,
                partial,
                settings.count,
            )),
        ],
        tools: Vec::new(),
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
    };

    let chat = Arc::clone(chat);
    let reply = tokio::task::spawn_blocking(move || chat.complete(&request)).await??;

    let mut suggestions = parse_suggestions(reply.text())?;
    suggestions.truncate(settings.count);
    Ok(suggestions)
}

/// Read a JSON array of strings, tolerating a surrounding code fence.
/// Non-string elements are skipped; anything but an array yields an empty
/// list.
#[inline]
pub fn parse_suggestions(text: &str) -> anyhow::Result<Vec<String>> {
    let value: Value = serde_json::from_str(strip_code_fence(text))?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => {
                let s = s.trim().to_string();
                (!s.is_empty()).then_some(s)
            }
            _ => None,
        })
        .collect())
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop an info string such as `json` on the opening fence
    match inner.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('[') => rest.trim(),
        _ => inner.trim(),
    }
}
