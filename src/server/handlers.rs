//! HTTP handlers for the chat endpoints

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::{Html, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use super::app::AppState;
use super::landing::render_landing;
use crate::chat::ChatError;

/// Body of `POST /chat`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /set_model`
#[derive(Debug, Deserialize)]
pub struct SetModelForm {
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum SetModelResponse {
    Success { model: String, model_name: String },
    Error { message: String },
}

/// `GET /`
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.session_for(&headers).await;
    let ctx = {
        let guard = session.state.lock().await;
        state.chat.landing_context(&guard)
    };
    state.respond(&session, Html(render_landing(&ctx)))
}

/// `GET /models`
pub async fn models(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.session_for(&headers).await;
    let ctx = {
        let guard = session.state.lock().await;
        state.chat.landing_context(&guard)
    };
    state.respond(&session, Json(ctx))
}

/// `POST /set_model`
pub async fn set_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<SetModelForm>, FormRejection>,
) -> Response {
    let session = state.session_for(&headers).await;

    let requested = match form {
        Ok(Form(form)) => form.model,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected set_model body");
            String::new()
        }
    };

    let result = {
        let mut guard = session.state.lock().await;
        state.chat.set_active_model(&mut guard, &requested)
    };

    match result {
        Ok(selection) => state.respond(
            &session,
            Json(SetModelResponse::Success {
                model: selection.key,
                model_name: selection.display_name,
            }),
        ),
        Err(e) => {
            tracing::warn!(requested = %requested, error = %e, "Model change rejected");
            state.respond(
                &session,
                (
                    StatusCode::BAD_REQUEST,
                    Json(SetModelResponse::Error {
                        message: e.to_string(),
                    }),
                ),
            )
        }
    }
}

/// `POST /chat`
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let session = state.session_for(&headers).await;

    let message = match payload {
        Ok(Json(request)) => request.message.unwrap_or_default(),
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected chat body");
            return state.respond(&session, ChatError::EmptyMessage);
        }
    };

    // Held across the upstream call so one session runs one turn at a time
    let result = {
        let mut guard = session.state.lock().await;
        state.chat.send_chat_turn(&mut guard, &message).await
    };

    match result {
        Ok(reply) => state.respond(&session, Json(reply)),
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!(error = %e, "Chat turn rejected");
            } else {
                tracing::error!(error = %e, status = %e.status_code(), "Chat turn failed");
            }
            state.respond(&session, e)
        }
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "OK"
}
