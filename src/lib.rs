//! openrouter-chat: session-aware chat relay for OpenRouter
//!
//! Features:
//! - Per-session conversation history with model switching
//! - Full-history relay to an OpenAI-compatible completion endpoint
//! - "Final Answer:" splitting for reasoning-style models
//! - JSON errors for every failure, including upstream ones

pub mod chat;
pub mod config;
pub mod server;
pub mod session;
pub mod stats;
pub mod upstream;

pub use chat::{ChatError, ChatReply, ChatService, ModelRegistry, SessionState};
pub use config::AppConfig;
pub use server::{build_router, run_server, AppState};
