//! Text-generation backends.
//!
//! The engine only ever talks to a [`Generator`]; which server sits behind it
//! is a configuration detail.

mod ollama;
mod openai;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{GeneratorBackend, GeneratorConfig};
use crate::error::DebateError;

/// Sampling knobs sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    /// Context window size requested from the backend.
    pub context_size: u32,
    /// Maximum tokens to generate; `None` leaves it to the backend.
    pub max_tokens: Option<u32>,
}

/// Intensity levels 1 through 10: (temperature, top_p, top_k).
const INTENSITY_TABLE: [(f32, f32, u32); 10] = [
    (0.3, 0.70, 20),
    (0.4, 0.75, 25),
    (0.5, 0.80, 30),
    (0.6, 0.85, 35),
    (0.7, 0.90, 40),
    (0.8, 0.92, 45),
    (0.9, 0.94, 50),
    (1.0, 0.95, 60),
    (1.1, 0.97, 70),
    (1.2, 0.99, 80),
];

pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 10;
pub const DEFAULT_INTENSITY: u8 = 5;

const DEFAULT_REPEAT_PENALTY: f32 = 1.1;
const DEFAULT_CONTEXT_SIZE: u32 = 128_000;

impl SamplingParams {
    /// Map a 1-10 intensity dial onto sampling aggressiveness. Out-of-range
    /// values are clamped.
    pub fn for_intensity(intensity: u8) -> Self {
        let level = intensity.clamp(MIN_INTENSITY, MAX_INTENSITY);
        let (temperature, top_p, top_k) = INTENSITY_TABLE[(level - 1) as usize];
        Self {
            temperature,
            top_p,
            top_k,
            repeat_penalty: DEFAULT_REPEAT_PENALTY,
            context_size: DEFAULT_CONTEXT_SIZE,
            max_tokens: None,
        }
    }

    /// Low-temperature settings for transcript analysis.
    pub fn analysis() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.8,
            top_k: 20,
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::for_intensity(DEFAULT_INTENSITY)
    }
}

/// A text-generation service.
///
/// Implementations must be safe to share across concurrently running debates.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt` with `model`.
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &SamplingParams,
    ) -> Result<String, DebateError>;

    /// Models the backend can serve.
    async fn list_models(&self) -> Result<Vec<String>, DebateError>;

    /// Whether the backend is reachable.
    async fn is_healthy(&self) -> bool;
}

/// Build the generator selected by `config.backend`.
pub fn from_config(config: &GeneratorConfig) -> Result<Arc<dyn Generator>, DebateError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let generator: Arc<dyn Generator> = match config.backend {
        GeneratorBackend::Ollama => {
            Arc::new(OllamaGenerator::new(&config.url, timeout)?.with_keep_alive(config.keep_alive))
        }
        GeneratorBackend::OpenAi => Arc::new(OpenAiGenerator::new(
            &config.url,
            config.api_key.as_deref().unwrap_or_default(),
            timeout,
        )?),
    };
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_table_endpoints() {
        let low = SamplingParams::for_intensity(1);
        assert_eq!((low.temperature, low.top_p, low.top_k), (0.3, 0.70, 20));

        let mid = SamplingParams::for_intensity(5);
        assert_eq!((mid.temperature, mid.top_p, mid.top_k), (0.7, 0.90, 40));

        let high = SamplingParams::for_intensity(10);
        assert_eq!((high.temperature, high.top_p, high.top_k), (1.2, 0.99, 80));
        assert_eq!(high.repeat_penalty, 1.1);
        assert_eq!(high.context_size, 128_000);
        assert_eq!(high.max_tokens, None);
    }

    #[test]
    fn test_intensity_is_clamped() {
        assert_eq!(SamplingParams::for_intensity(0), SamplingParams::for_intensity(1));
        assert_eq!(SamplingParams::for_intensity(42), SamplingParams::for_intensity(10));
    }

    #[test]
    fn test_intensity_is_monotonic() {
        for level in 1..10u8 {
            let lower = SamplingParams::for_intensity(level);
            let higher = SamplingParams::for_intensity(level + 1);
            assert!(higher.temperature > lower.temperature);
            assert!(higher.top_p > lower.top_p);
            assert!(higher.top_k > lower.top_k);
        }
    }

    #[test]
    fn test_analysis_params_are_conservative() {
        let params = SamplingParams::analysis();
        assert_eq!(params.temperature, 0.3);
        assert_eq!(params.top_k, 20);
    }
}
