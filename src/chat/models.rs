//! Immutable table of selectable upstream models

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashSet;

use crate::config::{AppConfig, ConfigError, ModelConfig};

const SITE_URL_PLACEHOLDER: &str = "${SITE_URL}";
const SITE_NAME_PLACEHOLDER: &str = "${SITE_NAME}";

/// A model the client can select
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    pub key: String,
    pub display_name: String,
    pub upstream_model_id: String,
    /// Sent in addition to the bearer credential
    pub extra_headers: HeaderMap,
}

/// Model table built once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDefinition>,
    default_key: String,
}

impl ModelRegistry {
    /// Build a registry, rejecting empty tables, duplicate keys and an unknown default
    pub fn new(models: Vec<ModelDefinition>, default_key: &str) -> Result<Self, ConfigError> {
        if models.is_empty() {
            return Err(ConfigError::Validation("model table is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for model in &models {
            if model.key.trim().is_empty() {
                return Err(ConfigError::Validation("model key must not be empty".to_string()));
            }
            if !seen.insert(model.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate model key: {}",
                    model.key
                )));
            }
        }

        if !seen.contains(default_key) {
            return Err(ConfigError::Validation(format!(
                "default model {:?} is not in the model table",
                default_key
            )));
        }

        Ok(Self {
            models,
            default_key: default_key.to_string(),
        })
    }

    /// Build from the `models` and `chat.default_model` config sections
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let site_url = config.upstream.site_url.as_deref();
        let site_name = config.upstream.site_name.as_deref();

        let models = config
            .models
            .iter()
            .map(|m| definition_from_config(m, site_url, site_name))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(models, &config.chat.default_model)
    }

    pub fn get(&self, key: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    /// All models in configuration order
    pub fn list(&self) -> &[ModelDefinition] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn definition_from_config(
    model: &ModelConfig,
    site_url: Option<&str>,
    site_name: Option<&str>,
) -> Result<ModelDefinition, ConfigError> {
    let mut extra_headers = HeaderMap::new();

    for (name, raw_value) in &model.headers {
        let value = raw_value
            .replace(SITE_URL_PLACEHOLDER, site_url.unwrap_or(""))
            .replace(SITE_NAME_PLACEHOLDER, site_name.unwrap_or(""));

        // An unset site value leaves nothing worth sending
        if value.trim().is_empty() {
            tracing::warn!(
                model = %model.key,
                header = %name,
                "Header value is empty after substitution, omitting it"
            );
            continue;
        }

        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("model {}: invalid header name {:?}: {}", model.key, name, e))
        })?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| {
            ConfigError::Validation(format!("model {}: invalid value for header {}: {}", model.key, name, e))
        })?;
        extra_headers.insert(header_name, header_value);
    }

    Ok(ModelDefinition {
        key: model.key.clone(),
        display_name: model.name.clone(),
        upstream_model_id: model.model_id.clone(),
        extra_headers,
    })
}
