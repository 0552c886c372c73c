//! Native Ollama backend (`/api/generate`, `/api/tags`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Generator, SamplingParams};
use crate::error::DebateError;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    /// Seconds the server keeps the model loaded after a request; 0 frees
    /// GPU memory immediately.
    keep_alive: i64,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DebateError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DebateError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            keep_alive: 0,
        })
    }

    pub fn with_keep_alive(mut self, keep_alive: i64) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_tags(&self, timeout: Option<Duration>) -> Result<TagsResponse, DebateError> {
        let mut request = self.client.get(self.url("/api/tags"));
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        if !response.status().is_success() {
            return Err(DebateError::Connection(format!(
                "Ollama returned {} for /api/tags",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| DebateError::Generation(format!("Malformed /api/tags response: {}", e)))
    }

    fn map_send_error(&self, error: reqwest::Error) -> DebateError {
        if error.is_connect() {
            DebateError::Connection(format!("Cannot connect to Ollama at {}: {}", self.base_url, error))
        } else if error.is_timeout() {
            DebateError::Generation(format!("Generation timed out: {}", error))
        } else {
            DebateError::Generation(format!("Generation failed: {}", error))
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &SamplingParams,
    ) -> Result<String, DebateError> {
        debug!(
            model,
            temperature = params.temperature,
            top_p = params.top_p,
            top_k = params.top_k,
            "ollama generate"
        );

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            keep_alive: self.keep_alive,
            options: GenerateOptions {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
                repeat_penalty: params.repeat_penalty,
                num_ctx: params.context_size,
                num_predict: params.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DebateError::Connection(format!("Model '{}' not found", model)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DebateError::Generation(format!("Ollama error: {} - {}", status, body)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DebateError::Generation(format!("Malformed generate response: {}", e)))?;

        let output = body.response.trim().to_string();
        debug!(chars = output.len(), "ollama generated");
        Ok(output)
    }

    async fn list_models(&self) -> Result<Vec<String>, DebateError> {
        let tags = self.fetch_tags(None).await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn is_healthy(&self) -> bool {
        match self.fetch_tags(Some(HEALTH_CHECK_TIMEOUT)).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Ollama health check failed: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    keep_alive: i64,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    num_ctx: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_payload_shape() {
        let params = SamplingParams::for_intensity(8).with_max_tokens(256);
        let request = GenerateRequest {
            model: "gemma3:27b",
            prompt: "hi",
            stream: false,
            keep_alive: 0,
            options: GenerateOptions {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
                repeat_penalty: params.repeat_penalty,
                num_ctx: params.context_size,
                num_predict: params.max_tokens,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["top_k"], 60);
        assert_eq!(json["options"]["num_ctx"], 128_000);
        assert_eq!(json["options"]["num_predict"], 256);
    }

    #[test]
    fn test_uncapped_request_omits_num_predict() {
        let options = GenerateOptions {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            num_ctx: 128_000,
            num_predict: None,
        };
        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get("num_predict").is_none());
    }

    #[test]
    fn test_tags_response_parsing() {
        let tags: TagsResponse =
            serde_json::from_str(r#"{"models":[{"name":"llama3:8b","size":1},{"name":"qwen3"}]}"#)
                .unwrap();
        let names: Vec<_> = tags.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3:8b", "qwen3"]);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let generator =
            OllamaGenerator::new("http://localhost:11434/", Duration::from_secs(1)).unwrap();
        assert_eq!(generator.url("/api/tags"), "http://localhost:11434/api/tags");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let generator =
            OllamaGenerator::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(!generator.is_healthy().await);
    }
}
