//! Tool-calling agent loop over a chat model.
//!
//! Each round sends the conversation plus the registered tool definitions.
//! A reply with tool calls gets one observation message per call and another
//! round; a reply without tool calls is the answer.

pub mod prompt;
pub mod tools;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::llm::{ChatMessage, ChatModel, ChatRequest, ToolCall};
pub use tools::{RetrievalTool, Tool, ToolRegistry};

#[derive(Clone)]
pub struct Agent {
    chat: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    temperature: f32,
    max_iterations: usize,
}

impl Agent {
    #[inline]
    pub fn new(
        chat: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        temperature: f32,
        max_iterations: usize,
    ) -> Self {
        Self {
            chat,
            tools,
            temperature,
            max_iterations,
        }
    }

    #[inline]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `input` given the system instruction and earlier turns
    #[inline]
    pub async fn run(&self, system: &str, history: &[ChatMessage], input: &str) -> Result<String> {
        let mut messages = prompt::assemble(system, history, input);
        let definitions = self.tools.definitions();

        for iteration in 1..=self.max_iterations {
            let request = ChatRequest {
                messages: messages.clone(),
                tools: definitions.clone(),
                temperature: Some(self.temperature),
                max_tokens: None,
            };

            let chat = Arc::clone(&self.chat);
            let reply = tokio::task::spawn_blocking(move || chat.complete(&request))
                .await
                .context("Chat completion task failed")??;

            if reply.tool_calls.is_empty() {
                info!("Agent answered after {} round(s)", iteration);
                return Ok(reply.text().to_string());
            }

            debug!(
                "Round {}: model requested {} tool call(s)",
                iteration,
                reply.tool_calls.len()
            );
            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in &calls {
                let observation = self.observe(call).await?;
                messages.push(ChatMessage::tool(call.id.clone(), observation));
            }
        }

        bail!(
            "Agent stopped after {} rounds without a final answer",
            self.max_iterations
        )
    }

    /// Run one tool call. Calls the model got wrong are reported back to it
    /// as observations; failures of the tool itself end the run.
    async fn observe(&self, call: &ToolCall) -> Result<String> {
        let name = call.function.name.as_str();
        let Some(tool) = self.tools.get(name) else {
            warn!("Model called unknown tool '{}'", name);
            return Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                name,
                self.tools.names().join(", ")
            ));
        };

        let arguments: Value = match serde_json::from_str(&call.function.arguments) {
            Ok(value) => value,
            Err(e) => {
                warn!("Model sent malformed arguments to '{}': {}", name, e);
                return Ok(format!("Invalid JSON arguments for {}: {}", name, e));
            }
        };

        tool.invoke(&arguments)
            .await
            .with_context(|| format!("Tool '{}' failed", name))
    }
}
