//! Tools the chat model may call while answering


use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::llm::ToolDefinition;
use crate::retrieval::Retriever;

/// A capability the agent can hand to the model
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied arguments object, returning the
    /// observation passed back to the model
    async fn invoke(&self, arguments: &Value) -> Result<String>;
}

/// Tools by name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    #[inline]
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Definitions of every registered tool, ordered by name
    #[inline]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    #[inline]
    pub fn names(&self) -> Vec<String> {
        self.definitions().into_iter().map(|d| d.name).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registry holding only the knowledge base retrieval tool
    #[inline]
    pub fn with_retrieval(retriever: Retriever, brand: &str, top_k: usize) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RetrievalTool::new(retriever, brand, top_k)));
        registry
    }
}

/// Looks passages up in the PDF knowledge base
pub struct RetrievalTool {
    retriever: Retriever,
    brand: String,
    top_k: usize,
}

impl RetrievalTool {
    pub const NAME: &'static str = "pdf_extractor";

    #[inline]
    pub fn new(retriever: Retriever, brand: &str, top_k: usize) -> Self {
        Self {
            retriever,
            brand: brand.to_string(),
            top_k,
        }
    }
}

#[async_trait]
impl Tool for RetrievalTool {
    #[inline]
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: format!(
                "Tool to answer queries from the {} knowledge base PDFs.",
                self.brand
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "query to look up in retriever"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    #[inline]
    async fn invoke(&self, arguments: &Value) -> Result<String> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Missing required parameter: query"))?;

        debug!("Knowledge base lookup: '{}'", query);
        let chunks = self.retriever.top_k(query, self.top_k).await?;

        Ok(chunks
            .into_iter()
            .map(|chunk| chunk.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
