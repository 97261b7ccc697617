//! Chat proxy core: model table, session state, reply handling

mod conversation;
mod error;
mod models;
mod reply;
mod service;

pub use conversation::{ConversationTurn, Role, SessionState};
pub use error::ChatError;
pub use models::{ModelDefinition, ModelRegistry};
pub use reply::{ChatReply, FINAL_ANSWER_MARKER};
pub use service::{ChatService, LandingContext, ModelSelection, ModelSummary};
