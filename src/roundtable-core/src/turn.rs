//! Single-turn generation: prompt assembly, the backend call and response
//! cleanup.
//!
//! A turn never fails outright. Backend errors, timeouts and empty output all
//! come back as visible `[Error generating response: ...]` text flagged with
//! [`EntryKind::GenerationFailed`], so a debate keeps going when one speaker
//! drops out.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::DebateError;
use crate::generator::{Generator, SamplingParams};
use crate::participant::ParticipantConfig;
use crate::transcript::{EntryKind, TranscriptEntry};

/// Default cap on the length of a turn, in words.
pub const DEFAULT_WORD_LIMIT: u32 = 100;

/// Everything needed to prompt one participant for one turn.
#[derive(Debug, Clone)]
pub struct TurnRequest<'a> {
    pub participant: &'a ParticipantConfig,
    pub topic: &'a str,
    /// How the speaker is introduced, e.g. "an examiner in a cross-examination".
    pub setting: &'a str,
    /// Heading shown above `context`.
    pub context_heading: &'a str,
    pub context: String,
    /// Opponent statement, collected questions or moderator guidance.
    pub situation: Option<String>,
    pub instruction: &'a str,
    pub word_limit: u32,
    pub intensity: u8,
}

impl<'a> TurnRequest<'a> {
    pub fn new(participant: &'a ParticipantConfig, topic: &'a str, instruction: &'a str) -> Self {
        Self {
            participant,
            topic,
            setting: "a participant in a debate",
            context_heading: "Recent discussion",
            context: String::new(),
            situation: None,
            instruction,
            word_limit: DEFAULT_WORD_LIMIT,
            intensity: crate::generator::DEFAULT_INTENSITY,
        }
    }

    pub fn setting(mut self, setting: &'a str) -> Self {
        self.setting = setting;
        self
    }

    pub fn context(mut self, heading: &'a str, context: String) -> Self {
        self.context_heading = heading;
        self.context = context;
        self
    }

    pub fn situation(mut self, situation: impl Into<String>) -> Self {
        self.situation = Some(situation.into());
        self
    }

    pub fn word_limit(mut self, word_limit: u32) -> Self {
        self.word_limit = word_limit;
        self
    }

    pub fn intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity;
        self
    }

    /// Render the full prompt sent to the backend.
    pub fn prompt(&self) -> String {
        let participant = self.participant;
        let mut prompt = format!(
            "You are {}, {}.\n\nTopic: {}\n\n",
            participant.label, self.setting, self.topic
        );

        if !self.context.is_empty() {
            prompt.push_str(&format!("{}:\n{}\n\n", self.context_heading, self.context));
        }
        if let Some(situation) = &self.situation {
            prompt.push_str(situation);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!(
            "Your role: {}\nStyle: {}\n\n\
             IMPORTANT: Do NOT introduce yourself by name or use placeholder text like \"[Your Name]\". \
             Your identity is already displayed. Jump straight into your response.\n\n\
             {} (MAX {} words).",
            participant.stance.guidance(),
            participant.tone.instruction(),
            self.instruction.trim_end_matches('.'),
            self.word_limit
        ));
        prompt
    }
}

/// The text a turn produced, and whether it is a failure placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnText {
    pub content: String,
    pub error: Option<String>,
}

impl TurnText {
    fn failed(error: &DebateError) -> Self {
        let reason = match error {
            DebateError::Connection(reason) | DebateError::Generation(reason) => reason.clone(),
            other => other.to_string(),
        };
        Self {
            content: format!("[Error generating response: {}]", reason),
            error: Some(reason),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_entry(self, participant: &ParticipantConfig, round: u32) -> TranscriptEntry {
        let kind = if self.is_failure() {
            EntryKind::GenerationFailed
        } else {
            EntryKind::Turn
        };
        TranscriptEntry::new(participant, self.content, round).with_kind(kind)
    }
}

/// Prompts a participant's model and cleans up what comes back.
#[derive(Clone)]
pub struct TurnGenerator {
    generator: Arc<dyn Generator>,
    timeout: Duration,
    token_cap: Option<u32>,
}

impl TurnGenerator {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self {
            generator,
            timeout,
            token_cap: None,
        }
    }

    pub fn with_token_cap(mut self, token_cap: Option<u32>) -> Self {
        self.token_cap = token_cap;
        self
    }

    pub async fn generate_turn(&self, request: &TurnRequest<'_>) -> TurnText {
        match self.try_generate(request).await {
            Ok(content) => TurnText {
                content,
                error: None,
            },
            Err(e) => {
                warn!(speaker = %request.participant.label, "Turn failed: {}", e);
                TurnText::failed(&e)
            }
        }
    }

    async fn try_generate(&self, request: &TurnRequest<'_>) -> Result<String, DebateError> {
        let model = request.participant.model.model_name().ok_or_else(|| {
            DebateError::Generation(format!(
                "{} takes external input and has no model",
                request.participant.label
            ))
        })?;

        let prompt = request.prompt();
        let mut params = SamplingParams::for_intensity(request.intensity);
        if let Some(cap) = self.token_cap {
            params = params.with_max_tokens(cap);
        }
        debug!(
            speaker = %request.participant.label,
            model,
            chars = prompt.len(),
            "generating turn"
        );

        let call = self.generator.generate(&prompt, model, &params);
        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DebateError::Generation(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let content = sanitize_response(&raw);
        if content.is_empty() {
            return Err(DebateError::Generation("model returned no text".to_string()));
        }
        Ok(content)
    }
}

/// Reasoning blocks some models emit ahead of their answer.
const REASONING_TAGS: [&str; 15] = [
    "thinking",
    "think",
    "reflection",
    "reflect",
    "internal",
    "reasoning",
    "thought",
    "scratch",
    "scratchpad",
    "plan",
    "analysis",
    "analyze",
    "consider",
    "pondering",
    "deliberation",
];

static REASONING_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REASONING_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>")).ok())
        .collect()
});
static ORPHAN_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"</?\w+[^>]*>").ok());
static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Strip reasoning blocks, stray tags and `*` emphasis, then collapse
/// whitespace.
pub fn sanitize_response(response: &str) -> String {
    let mut result = response.to_string();

    for re in REASONING_BLOCKS.iter() {
        result = re.replace_all(&result, "").into_owned();
    }

    if let Some(orphan) = ORPHAN_TAG.as_ref() {
        result = orphan.replace_all(&result, "").into_owned();
    }

    result = result.replace('*', "");

    if let Some(whitespace) = WHITESPACE.as_ref() {
        result = whitespace.replace_all(&result, " ").into_owned();
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{ParticipantRole, StanceMode, StyleTone};
    use crate::testing::ScriptedGenerator;

    fn speaker() -> ParticipantConfig {
        ParticipantConfig::new("Ada", "llama3:8b", ParticipantRole::Debater)
            .with_stance(StanceMode::Invert)
            .with_tone(StyleTone::Satirical)
    }

    fn turns(generator: Arc<ScriptedGenerator>) -> TurnGenerator {
        TurnGenerator::new(generator, Duration::from_secs(5))
    }

    #[test]
    fn test_cleanup_patterns_all_compile() {
        assert_eq!(REASONING_BLOCKS.len(), REASONING_TAGS.len());
        assert!(ORPHAN_TAG.is_some());
        assert!(WHITESPACE.is_some());
    }

    #[test]
    fn test_sanitize_response_thinking_tags() {
        let input = "<thinking>Let me think about this...</thinking>The answer is 42.";
        assert_eq!(sanitize_response(input), "The answer is 42.");
    }

    #[test]
    fn test_sanitize_response_reflection_tags() {
        let input = "Hello <reflection>internal thought</reflection> world!";
        assert_eq!(sanitize_response(input), "Hello world!");
    }

    #[test]
    fn test_sanitize_response_no_tags() {
        assert_eq!(sanitize_response("No tags here, just text."), "No tags here, just text.");
    }

    #[test]
    fn test_sanitize_response_multiline_tags() {
        let input = "<think>\nMultiple\nlines\nof\nthought\n</think>Final answer here.";
        assert_eq!(sanitize_response(input), "Final answer here.");
    }

    #[test]
    fn test_sanitize_response_orphans_and_emphasis() {
        let input = "Start <think>nested <inner>tags</inner> content</think> **bold** end</b>";
        let output = sanitize_response(input);
        assert!(!output.contains('<'));
        assert!(!output.contains('*'));
        assert!(output.starts_with("Start"));
        assert!(output.ends_with("bold end"));
    }

    #[test]
    fn test_prompt_carries_stance_tone_and_limit() {
        let participant = speaker();
        let prompt = TurnRequest::new(&participant, "Cities should ban cars", "Respond to the points raised.")
            .setting("participating in a one-to-one debate")
            .context("Recent discussion", "Grace: Cars are freedom.".to_string())
            .situation("Grace just said:\nCars are freedom.")
            .word_limit(80)
            .prompt();

        assert!(prompt.starts_with("You are Ada, participating in a one-to-one debate."));
        assert!(prompt.contains("Topic: Cities should ban cars"));
        assert!(prompt.contains("Recent discussion:\nGrace: Cars are freedom."));
        assert!(prompt.contains("Grace just said:"));
        assert!(prompt.contains(StanceMode::Invert.guidance()));
        assert!(prompt.contains(StyleTone::Satirical.instruction()));
        assert!(prompt.contains("Do NOT introduce yourself"));
        assert!(prompt.ends_with("Respond to the points raised (MAX 80 words)."));
    }

    #[tokio::test]
    async fn test_turn_uses_participant_model_and_intensity() {
        let generator = Arc::new(ScriptedGenerator::always("<think>hmm</think> A *clear* answer."));
        let participant = speaker();
        let request = TurnRequest::new(&participant, "Topic", "Answer.").intensity(9);

        let text = turns(generator.clone()).generate_turn(&request).await;
        assert_eq!(text.content, "A clear answer.");
        assert!(!text.is_failure());

        let calls = generator.calls();
        assert_eq!(calls[0].model, "llama3:8b");
        assert_eq!(calls[0].params, SamplingParams::for_intensity(9));
        assert_eq!(calls[0].params.max_tokens, None);
    }

    #[tokio::test]
    async fn test_token_cap_reaches_backend() {
        let generator = Arc::new(ScriptedGenerator::numbered());
        let participant = speaker();
        let request = TurnRequest::new(&participant, "Topic", "Answer.").intensity(3);

        turns(generator.clone())
            .with_token_cap(Some(256))
            .generate_turn(&request)
            .await;

        let params = generator.calls()[0].params;
        assert_eq!(params.max_tokens, Some(256));
        assert_eq!(params.temperature, SamplingParams::for_intensity(3).temperature);
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_placeholder() {
        let generator = Arc::new(ScriptedGenerator::failing("connection refused"));
        let participant = speaker();
        let request = TurnRequest::new(&participant, "Topic", "Answer.");

        let text = turns(generator).generate_turn(&request).await;
        assert_eq!(text.content, "[Error generating response: connection refused]");
        let entry = text.into_entry(&participant, 3);
        assert_eq!(entry.kind, EntryKind::GenerationFailed);
        assert_eq!(entry.round, 3);
    }

    #[tokio::test]
    async fn test_timeout_becomes_placeholder() {
        let generator =
            Arc::new(ScriptedGenerator::numbered().delayed(Duration::from_millis(500)));
        let turns = TurnGenerator::new(generator, Duration::from_millis(20));
        let participant = speaker();
        let request = TurnRequest::new(&participant, "Topic", "Answer.");

        let text = turns.generate_turn(&request).await;
        assert!(text.is_failure());
        assert!(text.content.contains("timed out"));
    }

    #[tokio::test]
    async fn test_output_empty_after_cleanup_is_a_failure() {
        let generator = Arc::new(ScriptedGenerator::always("<thinking>only thoughts</thinking>"));
        let participant = speaker();
        let request = TurnRequest::new(&participant, "Topic", "Answer.");

        let text = turns(generator).generate_turn(&request).await;
        assert!(text.is_failure());
    }

    #[tokio::test]
    async fn test_external_participant_is_never_sent_to_backend() {
        let generator = Arc::new(ScriptedGenerator::numbered());
        let human = ParticipantConfig::new("Human", "USER", ParticipantRole::Debater);
        let request = TurnRequest::new(&human, "Topic", "Answer.");

        let text = turns(generator.clone()).generate_turn(&request).await;
        assert!(text.is_failure());
        assert_eq!(generator.call_count(), 0);
    }
}
