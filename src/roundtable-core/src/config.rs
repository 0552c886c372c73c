//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::DebateError;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub debate: DebateSettings,
    #[serde(default)]
    pub context: ContextSettings,
}

/// Which wire protocol the generation backend speaks.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    Ollama,
    OpenAi,
}

/// Generation backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub default_model: String,
    /// Model used by the delegated metrics estimator.
    pub metrics_model: String,
    /// Ceiling for a single generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub keep_alive: i64,
    /// Token cap for each debate turn; unset leaves length to the model.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// How debate metrics are produced.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricsStrategy {
    #[default]
    Heuristic,
    Delegated,
}

/// Debate-level knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebateSettings {
    pub metrics: MetricsStrategy,
    /// Agreement score (0-10) at or above which a debate counts as converged.
    pub convergence_threshold: f64,
    pub max_rounds_limit: u32,
    pub default_intensity: u8,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            metrics: MetricsStrategy::Heuristic,
            convergence_threshold: 8.0,
            max_rounds_limit: 50,
            default_intensity: 5,
        }
    }
}

/// Per-entry character budgets for non-moderator context windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub char_budget: usize,
    pub single_turn_char_budget: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            char_budget: 300,
            single_turn_char_budget: 200,
        }
    }
}

fn default_timeout_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Load configuration from string content.
    pub fn from_toml(content: &str) -> Result<Self, DebateError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DebateError> {
        if !(0.0..=10.0).contains(&self.debate.convergence_threshold) {
            return Err(DebateError::ConfigError(format!(
                "convergence_threshold must be within 0-10, got {}",
                self.debate.convergence_threshold
            )));
        }
        if self.debate.max_rounds_limit == 0 {
            return Err(DebateError::ConfigError(
                "max_rounds_limit must be at least 1".to_string(),
            ));
        }
        if self.generator.timeout_secs == 0 {
            return Err(DebateError::ConfigError(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides (`OLLAMA_URL`, `OPENAI_API_BASE`,
    /// `OPENAI_API_KEY`, `DEFAULT_MODEL`, `METRICS_MODEL`).
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let url_key = match self.generator.backend {
            GeneratorBackend::Ollama => "OLLAMA_URL",
            GeneratorBackend::OpenAi => "OPENAI_API_BASE",
        };
        if let Some(url) = lookup(url_key) {
            self.generator.url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(model) = lookup("DEFAULT_MODEL") {
            self.generator.default_model = model;
        }
        if let Some(model) = lookup("METRICS_MODEL") {
            self.generator.metrics_model = model;
        }
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        generator: GeneratorConfig {
            backend: GeneratorBackend::Ollama,
            url: "http://localhost:11434".to_string(),
            api_key: None,
            default_model: "gemma3:27b".to_string(),
            metrics_model: "gemma3:27b".to_string(),
            timeout_secs: default_timeout_secs(),
            keep_alive: 0,
            max_tokens: None,
        },
        debate: DebateSettings::default(),
        context: ContextSettings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [generator]
            backend = "openai"
            url = "http://localhost:8080/v1"
            default_model = "qwen3"
            metrics_model = "qwen3"
            "#,
        )
        .unwrap();

        assert_eq!(config.generator.backend, GeneratorBackend::OpenAi);
        assert_eq!(config.generator.timeout_secs, 300);
        assert_eq!(config.generator.max_tokens, None);
        assert_eq!(config.debate.metrics, MetricsStrategy::Heuristic);
        assert_eq!(config.debate.convergence_threshold, 8.0);
        assert_eq!(config.context.char_budget, 300);
        assert_eq!(config.context.single_turn_char_budget, 200);
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
            [generator]
            backend = "ollama"
            url = "http://gpu-box:11434"
            default_model = "llama3:8b"
            metrics_model = "gemma3:27b"
            timeout_secs = 60
            keep_alive = 300
            max_tokens = 400

            [debate]
            metrics = "delegated"
            convergence_threshold = 7.5

            [context]
            char_budget = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.generator.keep_alive, 300);
        assert_eq!(config.generator.max_tokens, Some(400));
        assert_eq!(config.debate.metrics, MetricsStrategy::Delegated);
        assert_eq!(config.debate.convergence_threshold, 7.5);
        assert_eq!(config.debate.max_rounds_limit, 50);
        assert_eq!(config.context.char_budget, 250);
        assert_eq!(config.context.single_turn_char_budget, 200);
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected() {
        let result = Config::from_toml(
            r#"
            [generator]
            backend = "ollama"
            url = "http://localhost:11434"
            default_model = "m"
            metrics_model = "m"

            [debate]
            convergence_threshold = 12.0
            "#,
        );
        assert!(matches!(result, Err(DebateError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result = Config::from_toml(
            r#"
            [generator]
            backend = "carrier-pigeon"
            url = "x"
            default_model = "m"
            metrics_model = "m"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_follow_backend() {
        let mut config = default_config();
        config.apply_overrides(|key| match key {
            "OLLAMA_URL" => Some("http://remote:11434".to_string()),
            "OPENAI_API_BASE" => Some("http://wrong".to_string()),
            "METRICS_MODEL" => Some("qwen3".to_string()),
            _ => None,
        });
        assert_eq!(config.generator.url, "http://remote:11434");
        assert_eq!(config.generator.metrics_model, "qwen3");
        assert_eq!(config.generator.default_model, "gemma3:27b");
    }
}
