//! Shared state, router and listener

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::chat::{ChatService, ModelRegistry};
use crate::config::{AppConfig, ConfigError};
use crate::session::{get_cookie_value, session_cookie, SessionHandle, SessionStore};
use crate::upstream::{CompletionBackend, UpstreamClient, UpstreamClientError};

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chat: Arc<ChatService>,
    pub sessions: Arc<SessionStore>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] UpstreamClientError),
}

impl AppState {
    /// Validate the configuration and wire the OpenRouter client
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let client = UpstreamClient::from_config(&config.upstream)?;
        Ok(Self::with_backend(config, Arc::new(client))?)
    }

    /// Wire an arbitrary completion backend
    pub fn with_backend(
        config: AppConfig,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, ConfigError> {
        let registry = Arc::new(ModelRegistry::from_config(&config)?);
        let chat = ChatService::new(registry, backend, &config.chat);
        let sessions = SessionStore::new(config.session.ttl_seconds, config.session.max_sessions);

        Ok(Self {
            config: Arc::new(config),
            chat: Arc::new(chat),
            sessions: Arc::new(sessions),
        })
    }

    /// Session named by the request's cookie, created on first contact
    pub async fn session_for(&self, headers: &HeaderMap) -> SessionHandle {
        let id = get_cookie_value(headers, &self.config.session.cookie_name);
        self.sessions
            .get_or_create(id.as_deref(), || self.chat.new_session())
            .await
    }

    /// Attach `Set-Cookie` when the session was created by this request
    pub fn respond(&self, session: &SessionHandle, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        if session.is_new {
            let cookie = session_cookie(&self.config.session, &session.id);
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Session cookie is not a valid header value");
                }
            }
        }
        response
    }
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/models", get(handlers::models))
        .route("/set_model", post(handlers::set_model))
        .route("/chat", post(handlers::chat))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the chat server until Ctrl-C
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let upstream_url = config.upstream.url.clone();
    let timeout = config.upstream.timeout_seconds;

    let state = AppState::from_config(config)?;
    tracing::info!(
        models = state.chat.registry().len(),
        default_model = %state.chat.registry().default_key(),
        "Model table loaded"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("openrouter-chat listening on {}", addr);
    tracing::info!("Relaying to {} (timeout {}s)", upstream_url, timeout);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
