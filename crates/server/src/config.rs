//! Persisted server configuration (`.masforge/config.json`)

use std::path::{Path, PathBuf};

use masforge_core::models::{LlmProvider, ModelConfig};
use masforge_core::session::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const CONFIG_PATH: &str = ".masforge/config.json";

/// Provider and turn settings; every field optional so PATCH bodies merge
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, ToSchema)]
pub struct PersistedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_clarifying_question: Option<bool>,
}

impl PersistedConfig {
    pub async fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(path, content).await
    }

    pub fn merge(&mut self, other: PersistedConfig) {
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.extraction_timeout_secs.is_some() {
            self.extraction_timeout_secs = other.extraction_timeout_secs;
        }
        if other.history_window.is_some() {
            self.history_window = other.history_window;
        }
        if other.append_clarifying_question.is_some() {
            self.append_clarifying_question = other.append_clarifying_question;
        }
    }

    /// Model settings: persisted values win over the environment
    pub fn model_config(&self) -> anyhow::Result<ModelConfig> {
        let mut config = ModelConfig::from_env()?;
        if let Some(provider) = &self.provider {
            let provider: LlmProvider = provider.parse()?;
            if provider != config.provider {
                config = ModelConfig::for_provider(provider);
            }
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        Ok(config)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();
        OrchestratorConfig {
            extraction_timeout_secs: self
                .extraction_timeout_secs
                .unwrap_or(defaults.extraction_timeout_secs),
            history_window: self.history_window.unwrap_or(defaults.history_window),
            append_clarifying_question: self
                .append_clarifying_question
                .unwrap_or(defaults.append_clarifying_question),
        }
    }
}

pub fn default_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub config: PersistedConfig,
    pub defaults: ConfigDefaults,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigDefaults {
    pub provider: &'static str,
    pub model: &'static str,
    pub extraction_timeout_secs: u64,
    pub history_window: usize,
    pub append_clarifying_question: bool,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        let provider = LlmProvider::default();
        let turn = OrchestratorConfig::default();
        Self {
            provider: provider.id(),
            model: provider.default_model(),
            extraction_timeout_secs: turn.extraction_timeout_secs,
            history_window: turn.history_window,
            append_clarifying_question: turn.append_clarifying_question,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_only_overwrites_present_fields() {
        let mut config = PersistedConfig {
            provider: Some("anthropic".to_string()),
            history_window: Some(4),
            ..Default::default()
        };
        config.merge(PersistedConfig {
            model: Some("claude-sonnet-4-5".to_string()),
            history_window: Some(10),
            ..Default::default()
        });
        assert_eq!(config.provider.as_deref(), Some("anthropic"));
        assert_eq!(config.model.as_deref(), Some("claude-sonnet-4-5"));
        assert_eq!(config.history_window, Some(10));
    }

    #[test]
    fn test_orchestrator_config_falls_back_to_defaults() {
        let config = PersistedConfig {
            extraction_timeout_secs: Some(5),
            ..Default::default()
        };
        let turn = config.orchestrator_config();
        assert_eq!(turn.extraction_timeout_secs, 5);
        assert_eq!(turn.history_window, OrchestratorConfig::default().history_window);
        assert!(turn.append_clarifying_question);
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let config = PersistedConfig {
            provider: Some("nonsense".to_string()),
            ..Default::default()
        };
        assert!(config.model_config().is_err());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("masforge-config-{}", std::process::id()))
            .join("config.json");
        let config = PersistedConfig {
            provider: Some("gemini".to_string()),
            append_clarifying_question: Some(false),
            ..Default::default()
        };
        config.save(&path).await.unwrap();
        assert_eq!(PersistedConfig::load(&path).await, config);
        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let path = std::env::temp_dir().join("masforge-does-not-exist/config.json");
        assert_eq!(PersistedConfig::load(&path).await, PersistedConfig::default());
    }
}
