//! Per-user interactive session state


use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::autocomplete::SuggestionCache;
use crate::llm::{ChatMessage, Role};

/// Conversation and suggestion cache for one user session. Nothing here
/// outlives the session.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    pub history: ConversationHistory,
    pub suggestions: SuggestionCache,
}

/// What is left once a session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub messages: usize,
    pub cached_suggestions: usize,
}

impl Session {
    #[inline]
    pub fn start() -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            history: ConversationHistory::default(),
            suggestions: SuggestionCache::new(),
        };
        info!("Session {} started", session.id);
        session
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Drop the history and cache
    #[inline]
    pub fn end(self) -> SessionSummary {
        let summary = SessionSummary {
            id: self.id,
            started_at: self.started_at,
            ended_at: Utc::now(),
            messages: self.history.len(),
            cached_suggestions: self.suggestions.len(),
        };
        info!(
            "Session {} ended after {} messages",
            summary.id, summary.messages
        );
        summary
    }
}

/// Append-only list of user and assistant messages
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

/// One displayed entry of the conversation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exchange<'a> {
    Pair {
        user: &'a ChatMessage,
        assistant: &'a ChatMessage,
    },
    /// Trailing message without a partner
    Unpaired(&'a ChatMessage),
}

impl ConversationHistory {
    #[inline]
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Record a question and its answer
    #[inline]
    pub fn push_exchange(&mut self, question: &str, answer: &str) {
        self.messages.push(ChatMessage::new(Role::User, question));
        self.messages.push(ChatMessage::new(Role::Assistant, answer));
    }

    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages grouped two at a time from the start, newest group first.
    /// An odd count leaves the final message unpaired.
    #[inline]
    pub fn pairs(&self) -> Vec<Exchange<'_>> {
        self.messages
            .chunks(2)
            .rev()
            .filter_map(|chunk| match chunk {
                [user, assistant] => Some(Exchange::Pair { user, assistant }),
                [single] => Some(Exchange::Unpaired(single)),
                _ => None,
            })
            .collect()
    }
}
