//! Debate orchestration.
//!
//! [`DebateOrchestrator`] is the entry point: it validates a request, drives
//! the format's state machine round by round, mines key statements at each
//! checkpoint and scores the finished transcript. It keeps no state between
//! calls, so one orchestrator can run any number of debates concurrently.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, MetricsStrategy};
use crate::context::{ContextWindow, build_context};
use crate::debate_format::{DebateFormat, FormatMachine, RoundOutcome, Stage};
use crate::error::DebateError;
use crate::generator::{self, DEFAULT_INTENSITY, Generator};
use crate::highlights::KeyStatement;
use crate::metrics::{
    Analysis, DebateMetrics, DelegatedEstimator, HeuristicEstimator, MetricsEstimator,
    MetricsStatus,
};
use crate::participant::{ParticipantConfig, ParticipantRole};
use crate::session::{CancelHandle, DebateSession};
use crate::transcript::{EntryKind, TranscriptEntry};
use crate::turn::{TurnGenerator, TurnRequest};

/// Callback for debate events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Events emitted during a debate.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    /// A new round is starting.
    RoundStart { round: u32, max_rounds: u32 },
    /// A participant is about to speak.
    SpeakerStart {
        name: String,
        role: ParticipantRole,
        round: u32,
    },
    /// A participant has finished speaking (or failed to).
    SpeakerMessage {
        name: String,
        content: String,
        kind: EntryKind,
    },
    /// An external participant's turn was left open.
    AwaitingInput { name: String, round: u32 },
    /// The debate has concluded.
    DebateEnd { completed: bool },
}

/// Run-wide settings shared by every debate on one orchestrator.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// Agreement score at or above which a debate counts as converged.
    pub convergence_threshold: f64,
    pub max_rounds_limit: u32,
    /// Ceiling on a single generation call.
    pub turn_timeout: Duration,
    /// Per-entry context budget inside the format machines.
    pub char_budget: usize,
    /// Per-entry context budget for [`DebateOrchestrator::generate_turn`].
    pub single_turn_char_budget: usize,
    /// Token cap applied to every turn.
    pub max_tokens: Option<u32>,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            convergence_threshold: 8.0,
            max_rounds_limit: 50,
            turn_timeout: Duration::from_secs(300),
            char_budget: 300,
            single_turn_char_budget: 200,
            max_tokens: None,
        }
    }
}

impl From<&Config> for DebateConfig {
    fn from(config: &Config) -> Self {
        Self {
            convergence_threshold: config.debate.convergence_threshold,
            max_rounds_limit: config.debate.max_rounds_limit,
            turn_timeout: Duration::from_secs(config.generator.timeout_secs),
            char_budget: config.context.char_budget,
            single_turn_char_budget: config.context.single_turn_char_budget,
            max_tokens: config.generator.max_tokens,
        }
    }
}

/// A full debate to run.
#[derive(Debug, Clone)]
pub struct DebateRequest {
    pub topic: String,
    pub format: DebateFormat,
    pub participants: Vec<ParticipantConfig>,
    pub max_rounds: u32,
    /// Sampling intensity, 1 (measured) to 10 (heated).
    pub intensity: u8,
    pub cancel: CancelHandle,
}

impl DebateRequest {
    pub fn new(
        topic: impl Into<String>,
        format: DebateFormat,
        participants: Vec<ParticipantConfig>,
    ) -> Self {
        Self {
            topic: topic.into(),
            format,
            participants,
            max_rounds: 5,
            intensity: DEFAULT_INTENSITY,
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Whether the final metrics came from a successful analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisStatus {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a finished (or stopped) debate produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateResult {
    pub topic: String,
    pub format: DebateFormat,
    pub participants: Vec<ParticipantConfig>,
    #[serde(alias = "messages")]
    pub transcript: Vec<TranscriptEntry>,
    pub metrics: DebateMetrics,
    #[serde(alias = "keyStatements")]
    pub key_statements: Vec<KeyStatement>,
    pub completed: bool,
    pub convergence_reached: bool,
    pub awaiting_external_input: bool,
    pub cancelled: bool,
    pub analysis: AnalysisStatus,
}

/// One turn requested on its own, for interactive drivers.
#[derive(Debug, Clone)]
pub struct SingleTurnRequest {
    pub topic: String,
    pub participant: ParticipantConfig,
    /// Everything said so far.
    pub prior: Vec<TranscriptEntry>,
    pub round: u32,
    pub max_rounds: u32,
    pub intensity: u8,
    pub format: Option<DebateFormat>,
}

/// The entry a single turn produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub entry: TranscriptEntry,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How many prior entries a non-moderator sees in a single turn.
const SINGLE_TURN_WINDOW: usize = 3;
const SUMMARY_WORD_LIMIT: u32 = 200;

/// Orchestrates debates between model-backed participants.
pub struct DebateOrchestrator {
    generator: Arc<dyn Generator>,
    turns: TurnGenerator,
    estimator: Arc<dyn MetricsEstimator>,
    config: DebateConfig,
    /// Event callback.
    callback: Option<DebateCallback>,
}

impl DebateOrchestrator {
    pub fn new(
        generator: Arc<dyn Generator>,
        estimator: Arc<dyn MetricsEstimator>,
        config: DebateConfig,
    ) -> Self {
        Self {
            turns: TurnGenerator::new(generator.clone(), config.turn_timeout)
                .with_token_cap(config.max_tokens),
            generator,
            estimator,
            config,
            callback: None,
        }
    }

    /// Build the backend and estimator named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, DebateError> {
        let generator = generator::from_config(&config.generator)?;
        let estimator: Arc<dyn MetricsEstimator> = match config.debate.metrics {
            MetricsStrategy::Heuristic => Arc::new(HeuristicEstimator),
            MetricsStrategy::Delegated => Arc::new(DelegatedEstimator::new(
                generator.clone(),
                config.generator.metrics_model.clone(),
                Duration::from_secs(config.generator.timeout_secs),
            )),
        };
        Ok(Self::new(generator, estimator, DebateConfig::from(config)))
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    fn emit_event(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    fn validate(
        &self,
        request: &DebateRequest,
        machine: &dyn FormatMachine,
    ) -> Result<(), DebateError> {
        if request.topic.trim().is_empty() {
            return Err(DebateError::invalid("topic must not be empty"));
        }
        if !(1..=self.config.max_rounds_limit).contains(&request.max_rounds) {
            return Err(DebateError::invalid(format!(
                "max_rounds must be between 1 and {}, got {}",
                self.config.max_rounds_limit, request.max_rounds
            )));
        }
        machine.validate(&request.participants)
    }

    /// Run a full debate.
    ///
    /// Only an invalid request is an error, and it is reported before any
    /// generation call. Failed turns, suspension for external input,
    /// cancellation and degraded analysis all show up as flags on the result.
    pub async fn run_debate(&self, request: DebateRequest) -> Result<DebateResult, DebateError> {
        let machine = request.format.machine();
        self.validate(&request, machine.as_ref())?;

        info!(
            format = %request.format,
            participants = request.participants.len(),
            rounds = request.max_rounds,
            intensity = request.intensity,
            "Starting debate"
        );

        let mut session = DebateSession::new(
            request.topic.clone(),
            request.format,
            request.participants.clone(),
        );
        let stage = Stage::new(
            &self.turns,
            &request.topic,
            request.intensity,
            self.config.char_budget,
            &request.cancel,
            self.callback.as_ref(),
        );

        let mut outcome = machine.open(&stage, &mut session).await;
        if outcome == RoundOutcome::Continue {
            let produced = session.transcript.len();
            if let Some(count) = machine.checkpoint(0, produced) {
                session.record_key_statements(0, count);
            }
        }

        let mut rounds_run = 0;
        if outcome == RoundOutcome::Continue {
            for round in 1..=request.max_rounds {
                if request.cancel.is_cancelled() {
                    outcome = RoundOutcome::Cancelled;
                    break;
                }

                self.emit_event(DebateEvent::RoundStart {
                    round,
                    max_rounds: request.max_rounds,
                });
                debug!(round, "round start");
                session.current_round = round;

                let before = session.transcript.len();
                outcome = machine.run_round(&stage, &mut session, round).await;
                if outcome != RoundOutcome::Continue {
                    break;
                }
                rounds_run = round;

                let produced = session.transcript.len() - before;
                if let Some(count) = machine.checkpoint(round, produced) {
                    session.record_key_statements(round, count);
                }
            }
        }

        match outcome {
            RoundOutcome::Suspended => session.awaiting_external_input = true,
            RoundOutcome::Cancelled => session.cancelled = true,
            RoundOutcome::Continue => {}
        }
        session.completed = outcome == RoundOutcome::Continue && rounds_run == request.max_rounds;

        let analysis = self
            .estimator
            .analyze(&session.topic, &session.transcript, session.current_round)
            .await;
        session.metrics = analysis.metrics;
        if session.completed {
            session.metrics.status = MetricsStatus::Completed;
        }
        session.convergence_reached = session.metrics.meets(self.config.convergence_threshold);

        info!(
            entries = session.transcript.len(),
            completed = session.completed,
            agreement = session.metrics.agreement_score,
            converged = session.convergence_reached,
            "Debate finished"
        );
        self.emit_event(DebateEvent::DebateEnd {
            completed: session.completed,
        });

        Ok(DebateResult {
            topic: session.topic,
            format: session.format,
            participants: session.participants,
            transcript: session.transcript,
            metrics: session.metrics,
            key_statements: session.key_statements,
            completed: session.completed,
            convergence_reached: session.convergence_reached,
            awaiting_external_input: session.awaiting_external_input,
            cancelled: session.cancelled,
            analysis: AnalysisStatus {
                success: analysis.success,
                error: analysis.error,
            },
        })
    }

    /// Generate one participant's next turn given everything said so far.
    pub async fn generate_turn(&self, request: SingleTurnRequest) -> TurnOutcome {
        let participant = &request.participant;
        if participant.is_external() {
            return TurnOutcome {
                entry: TranscriptEntry::awaiting_input(participant, request.round),
                success: true,
                error: None,
            };
        }

        let role = participant.role;
        let opening = request.prior.is_empty();
        let final_summary = role.is_moderator() && request.round > request.max_rounds;

        let debate_setting = match request.format {
            Some(format) => format!("participating in a {}", format.display_name()),
            None => "participating in a debate".to_string(),
        };
        let (setting, heading, instruction) = if final_summary {
            (
                "the moderator of this debate",
                "Complete debate transcript",
                "This is the FINAL SUMMARY. Summarize the key arguments of every participant \
                 who spoke without leaving anyone out, identify points of agreement and \
                 disagreement, highlight the strongest point from each perspective and close \
                 with a brief conclusion that declares no winner",
            )
        } else if opening && role.is_moderator() {
            (
                "the moderator of this debate",
                "",
                "This is the opening. Welcome the participants, state the topic clearly, \
                 explain the format briefly and invite the participants to begin",
            )
        } else if opening {
            (
                debate_setting.as_str(),
                "",
                "This is your opening statement. Present your initial perspective on the topic",
            )
        } else {
            match role {
                ParticipantRole::Moderator => (
                    "the moderator of this debate",
                    "Full discussion so far",
                    "Acknowledge the key points of every participant who has spoken, ask \
                     clarifying questions and guide the discussion forward constructively",
                ),
                ParticipantRole::Examiner => (
                    "an examiner in this examination",
                    "Recent discussion",
                    "Ask a probing question or present a challenge to the examinee's position. \
                     Be specific and critical",
                ),
                ParticipantRole::Examinee => (
                    "the examinee responding to examiners",
                    "Recent discussion",
                    "Respond to the examiners' questions and challenges. Defend or refine your position",
                ),
                ParticipantRole::Debater | ParticipantRole::Panelist => (
                    debate_setting.as_str(),
                    "Recent discussion",
                    "Respond to the points raised. Be specific and direct",
                ),
            }
        };

        let context = if opening {
            String::new()
        } else {
            let window =
                ContextWindow::new(SINGLE_TURN_WINDOW, self.config.single_turn_char_budget);
            build_context(&request.prior, role, window)
        };

        let mut turn = TurnRequest::new(participant, &request.topic, instruction)
            .setting(setting)
            .context(heading, context)
            .intensity(request.intensity);
        if final_summary {
            turn = turn.word_limit(SUMMARY_WORD_LIMIT);
        }

        debug!(speaker = %participant.label, round = request.round, "single turn");
        let text = self.turns.generate_turn(&turn).await;
        let error = text.error.clone();
        TurnOutcome {
            entry: text.into_entry(participant, request.round),
            success: error.is_none(),
            error,
        }
    }

    /// Score a transcript on demand with the configured estimator.
    pub async fn analyze(&self, topic: &str, entries: &[TranscriptEntry], round: u32) -> Analysis {
        self.estimator.analyze(topic, entries, round).await
    }

    pub async fn list_models(&self) -> Result<Vec<String>, DebateError> {
        self.generator.list_models().await
    }

    pub async fn is_healthy(&self) -> bool {
        self.generator.is_healthy().await
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }
}
