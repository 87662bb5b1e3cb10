//! In-process model doubles for unit tests

use anyhow::{Result, anyhow};
use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;

use super::{
    ChatMessage, ChatModel, ChatRequest, EmbeddingModel, FunctionCall, ImageModel, ToolCall,
};

pub const DIMENSION: usize = 64;

/// Bag-of-words embedding: texts sharing words land close together
#[derive(Debug, Default)]
pub struct HashEmbedder {
    pub fail: bool,
}

impl HashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % DIMENSION as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        } else {
            vector[0] = 1.0;
        }
        vector
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            return Err(anyhow!("embedding service unavailable"));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(anyhow!("embedding service unavailable"));
        }
        Ok(Self::vector(text))
    }
}

/// Replays queued replies and records every request it receives
#[derive(Debug, Default)]
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<ChatMessage, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<Result<ChatMessage, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(ChatMessage::assistant(text))])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("lock should not be poisoned").len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .expect("lock should not be poisoned")
            .clone()
    }
}

impl ChatModel for ScriptedChat {
    fn complete(&self, request: &ChatRequest) -> Result<ChatMessage> {
        self.requests
            .lock()
            .expect("lock should not be poisoned")
            .push(request.clone());
        self.replies
            .lock()
            .expect("lock should not be poisoned")
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply left".to_string()))
            .map_err(|e| anyhow!(e))
    }
}

pub fn tool_call_reply(id: &str, name: &str, arguments: &str) -> ChatMessage {
    ChatMessage {
        content: None,
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }],
        ..ChatMessage::assistant("")
    }
}

/// Image model returning a fixed URL, or failing when none is set
#[derive(Debug, Default)]
pub struct FixedImage {
    pub url: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ImageModel for FixedImage {
    fn generate_image(&self, prompt: &str, _size: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .push(prompt.to_string());
        self.url
            .clone()
            .ok_or_else(|| anyhow!("image service unavailable"))
    }
}
