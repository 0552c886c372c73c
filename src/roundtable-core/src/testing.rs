//! Scripted generators for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DebateError;
use crate::generator::{Generator, SamplingParams};

#[derive(Debug, Clone)]
pub struct Call {
    pub prompt: String,
    pub model: String,
    pub params: SamplingParams,
}

enum Reply {
    Numbered,
    Fixed(String),
    Fail(String),
}

/// Records every call and answers from a script.
pub struct ScriptedGenerator {
    reply: Reply,
    failing_model: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGenerator {
    /// Replies `"Turn <n> from <model>. ..."`, numbering calls from 1.
    pub fn numbered() -> Self {
        Self::with_reply(Reply::Numbered)
    }

    pub fn always(text: &str) -> Self {
        Self::with_reply(Reply::Fixed(text.to_string()))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_reply(Reply::Fail(reason.to_string()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            failing_model: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call addressed to `model`.
    pub fn failing_for(mut self, model: &str) -> Self {
        self.failing_model = Some(model.to_string());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &SamplingParams,
    ) -> Result<String, DebateError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                prompt: prompt.to_string(),
                model: model.to_string(),
                params: *params,
            });
            calls.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_model.as_deref() == Some(model) {
            return Err(DebateError::Connection(format!("{} is offline", model)));
        }

        match &self.reply {
            Reply::Numbered => Ok(format!(
                "Turn {} from {}. A considered point about the topic at hand.",
                n, model
            )),
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::Fail(reason) => Err(DebateError::Generation(reason.clone())),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, DebateError> {
        Ok(vec!["scripted".to_string()])
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
