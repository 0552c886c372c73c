//! Error types for the debate engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebateError {
    /// The request cannot be run: wrong participant count, wrong roles for the
    /// format, empty topic or an out-of-range round count.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot reach generator: {0}")]
    Connection(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Could not parse analysis: {0}")]
    AnalysisParse(String),

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown debate format: {0}")]
    UnknownFormat(String),
}

impl DebateError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DebateError::InvalidConfiguration(message.into())
    }
}
