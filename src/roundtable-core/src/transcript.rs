//! Transcript entries.
//!
//! The transcript is append-only; its order is the record of what happened when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::{ParticipantConfig, ParticipantRole};

/// Placeholder content for a turn a human has yet to supply.
pub const AWAITING_INPUT_PLACEHOLDER: &str = "[Awaiting external input]";

/// How an entry came to exist.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A normal generated (or human-supplied) turn.
    #[default]
    Turn,
    /// A slot reserved for an external participant.
    AwaitingInput,
    /// The generator failed; content carries the visible error text.
    GenerationFailed,
}

/// A single message in the debate transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptEntry {
    /// Speaker's display label.
    pub speaker: String,
    pub content: String,
    pub role: ParticipantRole,
    /// Round this was spoken in; 0 for openings.
    #[serde(alias = "iteration")]
    pub round: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub kind: EntryKind,
}

impl TranscriptEntry {
    pub fn new(participant: &ParticipantConfig, content: impl Into<String>, round: u32) -> Self {
        Self {
            speaker: participant.label.clone(),
            content: content.into(),
            role: participant.role,
            round,
            timestamp: Utc::now(),
            kind: EntryKind::Turn,
        }
    }

    pub fn awaiting_input(participant: &ParticipantConfig, round: u32) -> Self {
        Self::new(participant, AWAITING_INPUT_PLACEHOLDER, round).with_kind(EntryKind::AwaitingInput)
    }

    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_turn(&self) -> bool {
        self.kind == EntryKind::Turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults_to_turn_when_missing() {
        let json = r#"{
            "speaker": "Ada",
            "content": "Hello there.",
            "role": "debater",
            "iteration": 2,
            "timestamp": "2025-01-01T00:00:00Z"
        }"#;
        let entry: TranscriptEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.kind, EntryKind::Turn);
        assert_eq!(entry.round, 2);
    }

    #[test]
    fn test_awaiting_input_placeholder() {
        let human = ParticipantConfig::new("Human", "USER", ParticipantRole::Debater);
        let entry = TranscriptEntry::awaiting_input(&human, 1);
        assert_eq!(entry.kind, EntryKind::AwaitingInput);
        assert_eq!(entry.content, AWAITING_INPUT_PLACEHOLDER);
        assert!(!entry.is_turn());
    }
}
