//! OpenRouter (OpenAI-compatible) chat completion wire types

use serde::{Deserialize, Serialize};

use crate::chat::ConversationTurn;

/// Chat completion request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl ChatCompletionRequest {
    pub fn new(model: &str, history: &[ConversationTurn]) -> Self {
        Self {
            model: model.to_string(),
            messages: history.iter().map(Message::from).collect(),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// Chat completion response
///
/// Only what the relay reads is modelled; `id`, `usage` and the rest are
/// ignored so provider-specific shapes never fail a good reply.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    /// OpenRouter may report mid-generation failures with a 200 status
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

impl ChatCompletionResponse {
    /// `choices[0].message.content`, if present
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .as_deref()
            .and_then(|choices| choices.first())
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

/// Response choice
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

/// Response message
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error envelope returned with non-success statuses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}
