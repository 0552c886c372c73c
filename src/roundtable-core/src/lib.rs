//! Roundtable Core Library
//!
//! Multi-party debate orchestration: per-format turn-taking state machines,
//! bounded context assembly, pluggable text-generation backends and
//! agreement/convergence metrics.

pub mod config;
pub mod context;
pub mod debate_format;
pub mod error;
pub mod generator;
pub mod highlights;
pub mod metrics;
pub mod orchestrator;
pub mod participant;
pub mod session;
pub mod transcript;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, MetricsStrategy};
pub use debate_format::{DebateFormat, FormatMachine};
pub use error::DebateError;
pub use generator::{Generator, SamplingParams};
pub use highlights::KeyStatement;
pub use metrics::{Analysis, DebateMetrics, MetricsEstimator};
pub use orchestrator::{
    DebateConfig, DebateEvent, DebateOrchestrator, DebateRequest, DebateResult,
    SingleTurnRequest, TurnOutcome,
};
pub use participant::{GeneratorIdentity, ParticipantConfig, ParticipantRole, StanceMode, StyleTone};
pub use session::CancelHandle;
pub use transcript::{EntryKind, TranscriptEntry};
