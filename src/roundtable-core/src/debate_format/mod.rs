//! Debate formats and the state machines that drive them.
//!
//! Each format is a [`FormatMachine`]: it validates who may take part, then
//! decides who speaks, in what order, and what each speaker is shown. The
//! orchestrator owns the round loop; machines only fill in one round at a time.

mod cross_exam;
mod many_on_one;
mod one_to_one;
mod panel;
mod round_robin;

pub use cross_exam::CrossExamFormat;
pub use many_on_one::ManyOnOneFormat;
pub use one_to_one::OneToOneFormat;
pub use panel::PanelFormat;
pub use round_robin::RoundRobinFormat;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{ContextWindow, build_context};
use crate::error::DebateError;
use crate::orchestrator::{DebateCallback, DebateEvent};
use crate::participant::{ParticipantConfig, ParticipantRole};
use crate::session::{CancelHandle, DebateSession};
use crate::transcript::TranscriptEntry;
use crate::turn::{TurnGenerator, TurnRequest};

/// Which turn-taking structure a debate follows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DebateFormat {
    /// Two debaters alternate.
    OneToOne,
    /// One examiner questions one examinee.
    CrossExam,
    /// Several examiners question one examinee.
    ManyOnOne,
    /// A moderator leads several panelists.
    Panel,
    /// Everyone speaks once per round, in order.
    RoundRobin,
}

impl DebateFormat {
    pub const ALL: [DebateFormat; 5] = [
        DebateFormat::OneToOne,
        DebateFormat::CrossExam,
        DebateFormat::ManyOnOne,
        DebateFormat::Panel,
        DebateFormat::RoundRobin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DebateFormat::OneToOne => "one-to-one",
            DebateFormat::CrossExam => "cross-exam",
            DebateFormat::ManyOnOne => "many-on-one",
            DebateFormat::Panel => "panel",
            DebateFormat::RoundRobin => "round-robin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DebateFormat::OneToOne => "One-to-One Debate",
            DebateFormat::CrossExam => "Cross-Examination",
            DebateFormat::ManyOnOne => "Many-on-One Examination",
            DebateFormat::Panel => "Moderated Panel",
            DebateFormat::RoundRobin => "Round Robin",
        }
    }

    /// Role expected of the participant at `index` in the participant list.
    pub fn role_for_position(&self, index: usize) -> ParticipantRole {
        match (self, index) {
            (DebateFormat::CrossExam, 0) => ParticipantRole::Examiner,
            (DebateFormat::CrossExam, _) => ParticipantRole::Examinee,
            (DebateFormat::ManyOnOne, 0) => ParticipantRole::Examinee,
            (DebateFormat::ManyOnOne, _) => ParticipantRole::Examiner,
            (DebateFormat::Panel, 0) => ParticipantRole::Moderator,
            (DebateFormat::Panel, _) => ParticipantRole::Panelist,
            (DebateFormat::OneToOne | DebateFormat::RoundRobin, _) => ParticipantRole::Debater,
        }
    }

    /// Give each participant the role its position implies.
    pub fn assign_roles(&self, participants: Vec<ParticipantConfig>) -> Vec<ParticipantConfig> {
        participants
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.with_role(self.role_for_position(i)))
            .collect()
    }

    /// The state machine that runs this format.
    pub fn machine(&self) -> Box<dyn FormatMachine> {
        match self {
            DebateFormat::OneToOne => Box::new(OneToOneFormat),
            DebateFormat::CrossExam => Box::new(CrossExamFormat),
            DebateFormat::ManyOnOne => Box::new(ManyOnOneFormat),
            DebateFormat::Panel => Box::new(PanelFormat),
            DebateFormat::RoundRobin => Box::new(RoundRobinFormat),
        }
    }
}

impl fmt::Display for DebateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DebateFormat {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('_', "-");
        DebateFormat::ALL
            .into_iter()
            .find(|format| format.name() == key)
            .ok_or_else(|| DebateError::UnknownFormat(s.to_string()))
    }
}

/// List all available debate format names.
pub fn available_formats() -> Vec<&'static str> {
    DebateFormat::ALL.iter().map(|f| f.name()).collect()
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Continue,
    /// An external participant must speak before anything else can happen.
    Suspended,
    /// The cancel handle fired between turns.
    Cancelled,
}

/// A turn-taking structure.
#[async_trait]
pub trait FormatMachine: Send + Sync {
    fn format(&self) -> DebateFormat;

    /// Check cardinality and position roles. Called before any generation.
    fn validate(&self, participants: &[ParticipantConfig]) -> Result<(), DebateError>;

    /// Round 0: opening statements, if the format has any.
    async fn open(&self, _stage: &Stage<'_>, _session: &mut DebateSession) -> RoundOutcome {
        RoundOutcome::Continue
    }

    async fn run_round(
        &self,
        stage: &Stage<'_>,
        session: &mut DebateSession,
        round: u32,
    ) -> RoundOutcome;

    /// How many trailing entries to mine for key statements after `round`,
    /// given it produced `produced` entries.
    fn checkpoint(&self, _round: u32, produced: usize) -> Option<usize> {
        Some(produced)
    }
}

/// One speaker's turn as a machine describes it.
#[derive(Debug, Clone)]
pub struct Turn<'p> {
    pub speaker: &'p ParticipantConfig,
    /// How the speaker is introduced in the prompt.
    pub setting: &'static str,
    /// How many recent entries a non-moderator sees.
    pub window: usize,
    pub situation: Option<String>,
    pub instruction: &'static str,
}

impl<'p> Turn<'p> {
    pub fn new(
        speaker: &'p ParticipantConfig,
        setting: &'static str,
        window: usize,
        instruction: &'static str,
    ) -> Self {
        Self {
            speaker,
            setting,
            window,
            situation: None,
            instruction,
        }
    }

    pub fn situation(mut self, situation: impl Into<String>) -> Self {
        self.situation = Some(situation.into());
        self
    }
}

/// What a machine needs to run turns: the turn generator, run-wide settings,
/// the cancel signal and the event sink.
pub struct Stage<'a> {
    turns: &'a TurnGenerator,
    topic: &'a str,
    intensity: u8,
    char_budget: usize,
    cancel: &'a CancelHandle,
    callback: Option<&'a DebateCallback>,
}

impl<'a> Stage<'a> {
    pub(crate) fn new(
        turns: &'a TurnGenerator,
        topic: &'a str,
        intensity: u8,
        char_budget: usize,
        cancel: &'a CancelHandle,
        callback: Option<&'a DebateCallback>,
    ) -> Self {
        Self {
            turns,
            topic,
            intensity,
            char_budget,
            cancel,
            callback,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn emit(&self, event: DebateEvent) {
        if let Some(callback) = self.callback {
            callback(event);
        }
    }

    /// Generate `turn`, append it to the transcript and return its content.
    ///
    /// Returns `None` without generating when the run has been cancelled.
    pub async fn speak(
        &self,
        session: &mut DebateSession,
        turn: Turn<'_>,
        round: u32,
    ) -> Option<String> {
        if self.is_cancelled() {
            session.cancelled = true;
            return None;
        }

        let speaker = turn.speaker;
        self.emit(DebateEvent::SpeakerStart {
            name: speaker.label.clone(),
            role: speaker.role,
            round,
        });

        let window = ContextWindow::new(turn.window, self.char_budget);
        let heading = if speaker.role.is_moderator() {
            "Full discussion so far"
        } else {
            "Recent discussion"
        };
        let mut request = TurnRequest::new(speaker, self.topic, turn.instruction)
            .setting(turn.setting)
            .context(heading, build_context(&session.transcript, speaker.role, window))
            .intensity(self.intensity);
        if let Some(situation) = turn.situation {
            request = request.situation(situation);
        }

        debug!(speaker = %speaker.label, round, "turn");
        let entry = self.turns.generate_turn(&request).await.into_entry(speaker, round);
        let content = entry.content.clone();
        self.emit(DebateEvent::SpeakerMessage {
            name: speaker.label.clone(),
            content: content.clone(),
            kind: entry.kind,
        });
        session.push(entry);
        Some(content)
    }

    /// Placeholder for a turn an external participant has to supply.
    pub fn await_input(&self, participant: &ParticipantConfig, round: u32) -> TranscriptEntry {
        self.emit(DebateEvent::AwaitingInput {
            name: participant.label.clone(),
            round,
        });
        TranscriptEntry::awaiting_input(participant, round)
    }
}

/// Reject external participants in formats that cannot wait for them.
fn reject_external(
    format: DebateFormat,
    participants: &[ParticipantConfig],
) -> Result<(), DebateError> {
    match participants.iter().find(|p| p.is_external()) {
        Some(p) => Err(DebateError::invalid(format!(
            "{} cannot wait for external input from '{}'",
            format.display_name(),
            p.label
        ))),
        None => Ok(()),
    }
}

/// Check that every participant holds the role its position requires.
fn require_position_roles(
    format: DebateFormat,
    participants: &[ParticipantConfig],
) -> Result<(), DebateError> {
    for (i, p) in participants.iter().enumerate() {
        let expected = format.role_for_position(i);
        if p.role != expected {
            return Err(DebateError::invalid(format!(
                "{} expects participant {} ('{}') to be {}, got {}",
                format.display_name(),
                i + 1,
                p.label,
                expected,
                p.role
            )));
        }
    }
    Ok(())
}

fn require_count(
    format: DebateFormat,
    participants: &[ParticipantConfig],
    min: usize,
    max: Option<usize>,
) -> Result<(), DebateError> {
    let count = participants.len();
    let too_many = max.is_some_and(|max| count > max);
    if count < min || too_many {
        let expected = match max {
            Some(max) if max == min => format!("exactly {}", min),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        return Err(DebateError::invalid(format!(
            "{} requires {} participants, got {}",
            format.display_name(),
            expected,
            count
        )));
    }
    Ok(())
}
