//! HTTP client for the completion endpoint

use async_trait::async_trait;
use reqwest::header;
use std::time::{Duration, Instant};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ErrorEnvelope};
use crate::chat::{ChatError, ConversationTurn, ModelDefinition};
use crate::config::UpstreamConfig;
use crate::stats::{format_request_log, format_response_log};

/// Longest slice of a raw upstream body surfaced in error messages
const ERROR_PREVIEW_CHARS: usize = 200;

/// Something that can turn a conversation into the next assistant message
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send the whole history to `model` and return the reply text
    async fn complete(
        &self,
        model: &ModelDefinition,
        history: &[ConversationTurn],
    ) -> Result<String, ChatError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamClientError {
    #[error("upstream API key is not configured")]
    MissingApiKey,

    #[error("Failed to read CA certificate: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// OpenRouter completion client
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
    timeout_seconds: u64,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("url", &self.url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish_non_exhaustive()
    }
}

/// Build an HTTP client with timeout and TLS configuration
pub fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, UpstreamClientError> {
    let mut client_builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .pool_max_idle_per_host(10);

    if let Some(ref tls) = config.tls {
        if tls.accept_invalid_certs {
            client_builder = client_builder.danger_accept_invalid_certs(true);
            tracing::warn!("TLS: Accepting invalid certificates (use only for development/testing)");
        }

        if let Some(ref ca_path) = tls.ca_cert_path {
            let ca_cert = std::fs::read(ca_path)?;
            let ca_cert = reqwest::Certificate::from_pem(&ca_cert)?;
            client_builder = client_builder.add_root_certificate(ca_cert);
            tracing::info!("TLS: Loaded custom CA certificate from {}", ca_path);
        }
    }

    Ok(client_builder.build()?)
}

impl UpstreamClient {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamClientError> {
        let api_key = config.api_key().ok_or(UpstreamClientError::MissingApiKey)?;

        Ok(Self {
            http_client: build_http_client(config)?,
            url: config.url.clone(),
            api_key: api_key.to_string(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, e: reqwest::Error) -> ChatError {
        if e.is_timeout() {
            ChatError::UpstreamTimeout(self.timeout_seconds)
        } else {
            ChatError::UpstreamUnavailable(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionBackend for UpstreamClient {
    async fn complete(
        &self,
        model: &ModelDefinition,
        history: &[ConversationTurn],
    ) -> Result<String, ChatError> {
        let start = Instant::now();
        let request = ChatCompletionRequest::new(&model.upstream_model_id, history);
        tracing::info!("{}", format_request_log(&request));

        let response = self
            .http_client
            .post(&self.url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .headers(model.extra_headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %self.url, "Failed to send upstream request");
                self.transport_error(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                error_body = %preview(&body),
                "Upstream returned error response"
            );
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(status.as_u16(), &body),
            });
        }

        let reply = parse_completion(&body)?;
        tracing::info!(
            "{}",
            format_response_log(&model.upstream_model_id, start.elapsed().as_millis(), reply.chars().count())
        );
        Ok(reply)
    }
}

/// Best-effort message for a non-success response: `error.message` when the
/// body is an error envelope, otherwise a preview of the raw body
pub fn upstream_error_message(status: u16, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }

    if body.trim().is_empty() {
        format!("Upstream returned HTTP {} with an empty body", status)
    } else {
        preview(body)
    }
}

/// Extract `choices[0].message.content` from a success body
pub fn parse_completion(body: &str) -> Result<String, ChatError> {
    let response: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(
            error = %e,
            body_preview = %preview(body),
            "Upstream body is not a chat completion"
        );
        ChatError::UpstreamProtocol(format!("invalid JSON: {}", preview(body)))
    })?;

    if let Some(content) = response.first_content() {
        return Ok(content.to_string());
    }

    match response.error.and_then(|e| e.message) {
        Some(message) => Err(ChatError::UpstreamProtocol(message)),
        None => Err(ChatError::UpstreamProtocol(
            "missing choices[0].message.content".to_string(),
        )),
    }
}

/// First [`ERROR_PREVIEW_CHARS`] characters of a body
fn preview(body: &str) -> String {
    body.chars().take(ERROR_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;

    #[test]
    fn test_error_message_from_envelope() {
        let msg = upstream_error_message(500, r#"{"error":{"message":"rate limited"}}"#);
        assert_eq!(msg, "rate limited");
    }

    #[test]
    fn test_error_message_from_raw_body_is_truncated() {
        let body = format!("<html>{}</html>", "x".repeat(500));
        let msg = upstream_error_message(502, &body);
        assert_eq!(msg.chars().count(), 200);
        assert!(msg.starts_with("<html>"));
    }

    #[test]
    fn test_error_message_envelope_without_message() {
        let body = r#"{"error":{"code":401}}"#;
        assert_eq!(upstream_error_message(401, body), body);
    }

    #[test]
    fn test_error_message_empty_body() {
        let msg = upstream_error_message(503, "");
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_parse_completion_ok() {
        let reply = parse_completion(r#"{"choices":[{"message":{"content":"Hi there"}}]}"#).unwrap();
        assert_eq!(reply, "Hi there");
    }

    #[test]
    fn test_parse_completion_partial_usage() {
        let reply = parse_completion(
            r#"{"choices":[{"message":{"content":"Hi there"}}],"usage":{"prompt_tokens":5,"completion_tokens":2}}"#,
        )
        .unwrap();
        assert_eq!(reply, "Hi there");

        let reply = parse_completion(
            r#"{"choices":[{"message":{"content":"Hi there"}}],"usage":{"total_tokens":7.0}}"#,
        )
        .unwrap();
        assert_eq!(reply, "Hi there");
    }

    #[test]
    fn test_parse_completion_invalid_json() {
        let err = parse_completion("<!doctype html>").unwrap_err();
        assert!(matches!(err, ChatError::UpstreamProtocol(_)));
        assert!(err.to_string().contains("<!doctype html>"));
    }

    #[test]
    fn test_parse_completion_missing_content() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(err.to_string().contains("choices[0].message.content"));
    }

    #[test]
    fn test_parse_completion_error_with_ok_status() {
        let err = parse_completion(r#"{"error":{"message":"provider overloaded","code":502}}"#)
            .unwrap_err();
        assert!(matches!(err, ChatError::UpstreamProtocol(ref m) if m == "provider overloaded"));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let err = UpstreamClient::from_config(&UpstreamConfig::default()).unwrap_err();
        assert!(matches!(err, UpstreamClientError::MissingApiKey));
    }

    #[test]
    fn test_from_config_missing_ca_file() {
        let config = UpstreamConfig {
            api_key: Some("sk-or-test".to_string()),
            tls: Some(TlsConfig {
                accept_invalid_certs: false,
                ca_cert_path: Some("/nonexistent/ca.pem".to_string()),
            }),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            UpstreamClient::from_config(&config),
            Err(UpstreamClientError::Io(_))
        ));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = UpstreamConfig {
            api_key: Some("sk-or-secret".to_string()),
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::from_config(&config).unwrap();
        assert!(!format!("{:?}", client).contains("sk-or-secret"));
        assert_eq!(client.url(), "https://openrouter.ai/api/v1/chat/completions");
    }
}
