//! OpenAI-compatible backend.
//!
//! Works against any server exposing `/chat/completions` (OpenAI, vLLM,
//! llama.cpp, Ollama's `/v1`). `top_k` and `repeat_penalty` have no
//! counterpart in the chat completions API and are not sent.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Generator, SamplingParams};
use crate::error::DebateError;

/// Chat-completions client shared by every debate in the process.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self, DebateError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DebateError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        let client = Client::with_config(config).with_http_client(http.clone());

        Ok(Self {
            client,
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &SamplingParams,
    ) -> Result<String, DebateError> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: prompt.to_string().into(),
                name: None,
            },
        )];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(model)
            .messages(messages)
            .temperature(params.temperature)
            .top_p(params.top_p);
        if let Some(max_tokens) = params.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        let request = args.build()?;

        debug!(model, temperature = params.temperature, "chat completion");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| DebateError::Generation(e.to_string()))?;

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    async fn list_models(&self) -> Result<Vec<String>, DebateError> {
        let response = self
            .http
            .get(format!("{}/models", self.api_base))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| DebateError::Connection(format!("Cannot reach {}: {}", self.api_base, e)))?;

        if !response.status().is_success() {
            return Err(DebateError::Connection(format!(
                "Model listing returned {}",
                response.status()
            )));
        }

        let listing: ModelList = response
            .json()
            .await
            .map_err(|e| DebateError::Generation(format!("Malformed model listing: {}", e)))?;
        Ok(listing.data.into_iter().map(|m| m.id).collect())
    }

    async fn is_healthy(&self) -> bool {
        self.list_models().await.is_ok()
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_list_parsing() {
        let listing: ModelList = serde_json::from_str(
            r#"{"object":"list","data":[{"id":"gpt-4o","object":"model"},{"id":"llama3"}]}"#,
        )
        .unwrap();
        let ids: Vec<_> = listing.data.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gpt-4o", "llama3"]);
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_connection_error() {
        let generator =
            OpenAiGenerator::new("http://127.0.0.1:9/v1", "", Duration::from_secs(1)).unwrap();
        match generator.list_models().await {
            Err(DebateError::Connection(_)) => {}
            other => panic!("expected connection error, got {:?}", other.map(|_| ())),
        }
        assert!(!generator.is_healthy().await);
    }
}
