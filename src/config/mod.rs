mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub use loader::load_config;

/// Environment variable holding the OpenRouter API key
pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
/// Environment variable holding the site URL sent as `HTTP-Referer`
pub const ENV_SITE_URL: &str = "SITE_URL";
/// Environment variable holding the site name sent as `X-Title`
pub const ENV_SITE_NAME: &str = "SITE_NAME";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            session: SessionConfig::default(),
            chat: ChatConfig::default(),
            models: default_models(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Upstream completion endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Full completion URL (e.g., "https://openrouter.ai/api/v1/chat/completions")
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Bearer credential; usually supplied through `OPENROUTER_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Substituted for `${SITE_URL}` in model headers
    #[serde(default)]
    pub site_url: Option<String>,
    /// Substituted for `${SITE_NAME}` in model headers
    #[serde(default)]
    pub site_name: Option<String>,
    /// TLS configuration options
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// TLS configuration for upstream connections
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Accept invalid certificates (self-signed, expired)
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Path to custom CA certificate (PEM format)
    pub ca_cert_path: Option<String>,
}

fn default_upstream_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_seconds: default_timeout(),
            api_key: None,
            site_url: None,
            site_name: None,
            tls: None,
        }
    }
}

impl UpstreamConfig {
    /// Returns true if the URL uses HTTPS
    pub fn is_tls(&self) -> bool {
        self.url.to_lowercase().starts_with("https://")
    }

    /// Sibling `/models` listing for a `/chat/completions` URL
    pub fn models_url(&self) -> Option<String> {
        self.url
            .trim_end_matches('/')
            .strip_suffix("/chat/completions")
            .map(|base| format!("{}/models", base))
    }

    /// Returns the API key if one is configured and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Session cookie and store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Idle lifetime of a session, also used as the cookie Max-Age
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Add the `Secure` attribute (requires HTTPS in front of the service)
    #[serde(default)]
    pub secure_cookie: bool,
    /// Sessions kept in memory; the least recently used one is evicted beyond this
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_cookie_name() -> String {
    "chat_session".to_string()
}

fn default_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_sessions() -> usize {
    10_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_seconds: default_ttl(),
            secure_cookie: false,
            max_sessions: default_max_sessions(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Model key assigned to new sessions
    #[serde(default = "default_model_key")]
    pub default_model: String,
    /// Keys containing this marker get their replies split at "Final Answer:"
    #[serde(default = "default_reasoning_marker")]
    pub reasoning_key_marker: String,
    /// Keep at most this many turns per session; unbounded when absent
    #[serde(default)]
    pub max_history_turns: Option<usize>,
}

fn default_model_key() -> String {
    "qwen".to_string()
}

fn default_reasoning_marker() -> String {
    "deepseek".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model_key(),
            reasoning_key_marker: default_reasoning_marker(),
            max_history_turns: None,
        }
    }
}

/// One selectable upstream model
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    pub key: String,
    pub name: String,
    pub model_id: String,
    /// Extra request headers; values may use `${SITE_URL}` and `${SITE_NAME}`
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ModelConfig {
    pub fn new(key: &str, name: &str, model_id: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            model_id: model_id.to_string(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// Built-in model table used when the config file does not list any
pub fn default_models() -> Vec<ModelConfig> {
    vec![
        ModelConfig::new("qwen", "Qwen 2.5 72B Instruct", "qwen/qwen-2.5-72b-instruct:free"),
        ModelConfig::new("deepseek_free", "DeepSeek R1 (free)", "deepseek/deepseek-r1:free"),
        ModelConfig::new(
            "deepseek_hf",
            "DeepSeek R1 Distill (site)",
            "deepseek/deepseek-r1-distill-llama-70b:free",
        )
        .with_header("HTTP-Referer", "${SITE_URL}")
        .with_header("X-Title", "${SITE_NAME}"),
        ModelConfig::new(
            "llama",
            "Llama 3.3 70B Instruct",
            "meta-llama/llama-3.3-70b-instruct:free",
        ),
    ]
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration with fallback to default locations, then built-in defaults
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                let default_paths = ["config.yaml", "config.yml", "./config/config.yaml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                tracing::info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply `OPENROUTER_API_KEY`, `SITE_URL` and `SITE_NAME` from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup; blank values are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.upstream.api_key = Some(key);
        }
        if let Some(site_url) = get(ENV_SITE_URL) {
            self.upstream.site_url = Some(site_url);
        }
        if let Some(site_name) = get(ENV_SITE_NAME) {
            self.upstream.site_name = Some(site_name);
        }
    }

    /// Check everything the server needs before it starts accepting requests
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.api_key().is_none() {
            return Err(ConfigError::Validation(format!(
                "missing upstream API key (set {} or upstream.api_key)",
                ENV_API_KEY
            )));
        }

        let url = url::Url::parse(&self.upstream.url).map_err(|e| {
            ConfigError::Validation(format!("invalid upstream URL {:?}: {}", self.upstream.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "upstream URL must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.upstream.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "upstream.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        if self.session.max_sessions == 0 {
            return Err(ConfigError::Validation(
                "session.max_sessions must be at least 1".to_string(),
            ));
        }

        if self.chat.max_history_turns == Some(0) {
            return Err(ConfigError::Validation(
                "chat.max_history_turns must be at least 1".to_string(),
            ));
        }

        crate::chat::ModelRegistry::from_config(self)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
