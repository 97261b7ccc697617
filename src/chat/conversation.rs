//! Conversation turns and per-session state

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a session's conversation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Active model and accumulated history for one client session
///
/// Only [`ChatService`](super::ChatService) mutates this, so the active key
/// always resolves in the registry the session was created from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionState {
    active_model_key: String,
    history: Vec<ConversationTurn>,
}

impl SessionState {
    pub fn new(active_model_key: impl Into<String>) -> Self {
        Self {
            active_model_key: active_model_key.into(),
            history: Vec::new(),
        }
    }

    pub fn active_model_key(&self) -> &str {
        &self.active_model_key
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Switch models; the previous conversation is discarded
    pub(crate) fn switch_model(&mut self, key: &str) {
        self.active_model_key = key.to_string();
        self.history.clear();
    }

    /// Append a turn, dropping the oldest turns beyond `cap`
    pub(crate) fn push_turn(&mut self, turn: ConversationTurn, cap: Option<usize>) {
        self.history.push(turn);
        if let Some(cap) = cap {
            let excess = self.history.len().saturating_sub(cap);
            if excess > 0 {
                self.history.drain(..excess);
                tracing::debug!(dropped = excess, cap, "Trimmed conversation history");
            }
        }
    }
}
