//! In-memory state of one debate run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::debate_format::DebateFormat;
use crate::highlights::{KeyStatement, extract_key_statements};
use crate::metrics::DebateMetrics;
use crate::participant::ParticipantConfig;
use crate::transcript::TranscriptEntry;

/// Cooperative stop signal for a running debate.
///
/// Checked before every turn and every round; a turn already in flight is
/// allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable state threaded through a format machine.
#[derive(Debug, Clone)]
pub struct DebateSession {
    pub topic: String,
    pub format: DebateFormat,
    pub participants: Vec<ParticipantConfig>,
    pub transcript: Vec<TranscriptEntry>,
    pub key_statements: Vec<KeyStatement>,
    pub metrics: DebateMetrics,
    pub current_round: u32,
    pub completed: bool,
    pub convergence_reached: bool,
    pub awaiting_external_input: bool,
    pub cancelled: bool,
}

impl DebateSession {
    pub fn new(
        topic: impl Into<String>,
        format: DebateFormat,
        participants: Vec<ParticipantConfig>,
    ) -> Self {
        Self {
            topic: topic.into(),
            format,
            participants,
            transcript: Vec::new(),
            key_statements: Vec::new(),
            metrics: DebateMetrics::baseline(0),
            current_round: 0,
            completed: false,
            convergence_reached: false,
            awaiting_external_input: false,
            cancelled: false,
        }
    }

    /// Append an entry. Rounds never go backwards.
    pub fn push(&mut self, entry: TranscriptEntry) {
        debug_assert!(
            self.transcript
                .last()
                .is_none_or(|last| last.round <= entry.round),
            "transcript rounds must be non-decreasing"
        );
        self.transcript.push(entry);
    }

    /// Append the pending placeholder and stop taking turns.
    pub fn suspend(&mut self, placeholder: TranscriptEntry) {
        self.push(placeholder);
        self.awaiting_external_input = true;
    }

    /// Most recent entry spoken under `label`.
    pub fn last_from(&self, label: &str) -> Option<&TranscriptEntry> {
        self.transcript.iter().rev().find(|entry| entry.speaker == label)
    }

    /// Mine the trailing `count` entries for highlights.
    pub fn record_key_statements(&mut self, round: u32, count: usize) {
        let start = self.transcript.len().saturating_sub(count);
        let statements = extract_key_statements(&self.transcript[start..], round);
        self.key_statements.extend(statements);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantRole;

    fn session() -> DebateSession {
        let a = ParticipantConfig::new("Ada", "m", ParticipantRole::Debater);
        let b = ParticipantConfig::new("Grace", "m", ParticipantRole::Debater);
        DebateSession::new("Topic", DebateFormat::OneToOne, vec![a, b])
    }

    #[test]
    fn test_cancel_handle_is_shared_between_clones() {
        let handle = CancelHandle::new();
        let observer = handle.clone();
        assert!(!observer.is_cancelled());
        handle.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_key_statements_come_from_trailing_entries() {
        let mut session = session();
        let ada = session.participants[0].clone();
        let grace = session.participants[1].clone();
        session.push(TranscriptEntry::new(&ada, "An early point about the topic.", 1));
        session.push(TranscriptEntry::new(&grace, "A later point about the topic.", 1));

        session.record_key_statements(1, 1);
        assert_eq!(session.key_statements.len(), 1);
        assert_eq!(session.key_statements[0].speaker, "Grace");

        session.record_key_statements(1, 10);
        assert_eq!(session.key_statements.len(), 3);
    }

    #[test]
    fn test_suspend_flags_session() {
        let mut session = session();
        let ada = session.participants[0].clone();
        session.suspend(TranscriptEntry::awaiting_input(&ada, 1));
        assert!(session.awaiting_external_input);
        assert_eq!(session.last_from("Ada").unwrap().round, 1);
        assert!(session.last_from("Grace").is_none());
    }
}
