//! Product Q&A over the knowledge base

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use crate::agent::{Agent, prompt};
use crate::autocomplete::SuggestionSettings;
use crate::catalog::Catalog;
use crate::llm::ChatModel;
use crate::retrieval::Retriever;
use crate::session::Session;

pub struct Assistant {
    agent: Agent,
    chat: Arc<dyn ChatModel>,
    retriever: Retriever,
    catalog: Catalog,
    suggestions: SuggestionSettings,
}

impl Assistant {
    #[inline]
    pub fn new(
        agent: Agent,
        chat: Arc<dyn ChatModel>,
        retriever: Retriever,
        catalog: Catalog,
        suggestions: SuggestionSettings,
    ) -> Self {
        Self {
            agent,
            chat,
            retriever,
            catalog,
            suggestions,
        }
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Answer `question` in the context of the session's conversation. The
    /// exchange is recorded only when an answer comes back.
    #[inline]
    pub async fn answer(&self, session: &mut Session, question: &str) -> Result<String> {
        let answer = self
            .agent
            .run(
                &prompt::search_system(),
                session.history.messages(),
                question,
            )
            .await
            .context("Failed to answer question")?;

        session.history.push_exchange(question, &answer);
        Ok(answer)
    }

    /// Catalog products named in the passage closest to `query`, falling
    /// back to the first catalog products. Empty when retrieval fails.
    #[inline]
    pub async fn similar_products(&self, query: &str) -> Vec<String> {
        match self.retriever.top_k(query, 1).await {
            Ok(chunks) => {
                let text = chunks
                    .into_iter()
                    .map(|chunk| chunk.text)
                    .collect::<Vec<_>>()
                    .join("\n");
                self.catalog.similar_products(&text)
            }
            Err(e) => {
                warn!("Failed to look up similar products: {}", e);
                Vec::new()
            }
        }
    }

    /// Autocomplete for the search box, cached in the session
    #[inline]
    pub async fn suggest(&self, session: &mut Session, partial: &str) -> Vec<String> {
        session
            .suggestions
            .suggest(partial, &self.chat, &self.suggestions)
            .await
    }
}
