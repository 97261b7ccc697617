//! The three chat operations over an explicit session value

use serde::Serialize;
use std::sync::Arc;

use super::{ChatError, ChatReply, ConversationTurn, ModelRegistry, SessionState};
use crate::config::ChatConfig;
use crate::upstream::CompletionBackend;

/// Model table and active selection, for rendering the landing page
#[derive(Debug, Clone, Serialize)]
pub struct LandingContext {
    pub current_model: String,
    pub current_model_name: String,
    pub models: Vec<ModelSummary>,
}

/// Public view of a model definition (headers stay server-side)
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub key: String,
    pub name: String,
    pub model_id: String,
}

/// Result of a successful model switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub key: String,
    pub display_name: String,
}

/// Chat proxy service
///
/// Stateless apart from the shared registry and backend: every operation
/// receives the caller's [`SessionState`] and the caller persists it.
pub struct ChatService {
    registry: Arc<ModelRegistry>,
    backend: Arc<dyn CompletionBackend>,
    reasoning_key_marker: String,
    max_history_turns: Option<usize>,
}

impl ChatService {
    pub fn new(
        registry: Arc<ModelRegistry>,
        backend: Arc<dyn CompletionBackend>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            reasoning_key_marker: config.reasoning_key_marker.clone(),
            max_history_turns: config.max_history_turns,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Fresh state for a client seen for the first time
    pub fn new_session(&self) -> SessionState {
        SessionState::new(self.registry.default_key())
    }

    /// Whether replies from `key` get split into reasoning and answer
    pub fn is_reasoning_model(&self, key: &str) -> bool {
        !self.reasoning_key_marker.is_empty() && key.contains(&self.reasoning_key_marker)
    }

    pub fn landing_context(&self, session: &SessionState) -> LandingContext {
        let current = session.active_model_key();
        let current_model_name = self
            .registry
            .get(current)
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| current.to_string());

        LandingContext {
            current_model: current.to_string(),
            current_model_name,
            models: self
                .registry
                .list()
                .iter()
                .map(|m| ModelSummary {
                    key: m.key.clone(),
                    name: m.display_name.clone(),
                    model_id: m.upstream_model_id.clone(),
                })
                .collect(),
        }
    }

    /// Select a model and start a new conversation; unknown keys change nothing
    pub fn set_active_model(
        &self,
        session: &mut SessionState,
        requested_key: &str,
    ) -> Result<ModelSelection, ChatError> {
        let requested_key = requested_key.trim();
        let model = self
            .registry
            .get(requested_key)
            .ok_or_else(|| ChatError::InvalidModel(requested_key.to_string()))?;

        let cleared = session.history().len();
        session.switch_model(&model.key);
        tracing::info!(model = %model.key, cleared_turns = cleared, "Active model changed");

        Ok(ModelSelection {
            key: model.key.clone(),
            display_name: model.display_name.clone(),
        })
    }

    /// Relay one user message and record the exchange.
    ///
    /// The user turn is kept even when the upstream call fails; the assistant
    /// turn is only appended once a reply has been parsed.
    pub async fn send_chat_turn(
        &self,
        session: &mut SessionState,
        user_message: &str,
    ) -> Result<ChatReply, ChatError> {
        let message = user_message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let model_key = session.active_model_key().to_string();
        let model = self
            .registry
            .get(&model_key)
            .ok_or_else(|| ChatError::InvalidModel(model_key.clone()))?;

        session.push_turn(ConversationTurn::user(message), self.max_history_turns);

        let turn_id = uuid::Uuid::new_v4();
        tracing::debug!(
            turn_id = %turn_id,
            model = %model.key,
            history_len = session.history().len(),
            "Sending chat turn upstream"
        );

        let reply = self.backend.complete(model, session.history()).await?;

        session.push_turn(ConversationTurn::assistant(reply.clone()), self.max_history_turns);
        tracing::debug!(turn_id = %turn_id, history_len = session.history().len(), "Chat turn recorded");

        if self.is_reasoning_model(&model.key) {
            Ok(ChatReply::split_reasoning(&reply))
        } else {
            Ok(ChatReply::plain(reply))
        }
    }
}
