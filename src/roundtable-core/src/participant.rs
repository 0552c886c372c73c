//! Participant definitions.
//!
//! A participant is fixed for the whole debate: who they are, which model
//! speaks for them, and the stance and tone they argue with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Behavioural category of a participant within a format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// Symmetric debater (one-to-one, round robin).
    Debater,
    /// Asks the questions in cross-examination and many-on-one.
    Examiner,
    /// Answers the questions in cross-examination and many-on-one.
    Examinee,
    /// Opens and summarizes a panel. Sees the whole transcript.
    Moderator,
    /// Speaks on a panel.
    Panelist,
}

impl ParticipantRole {
    pub fn display_name(&self) -> &str {
        match self {
            ParticipantRole::Debater => "DEBATER",
            ParticipantRole::Examiner => "EXAMINER",
            ParticipantRole::Examinee => "EXAMINEE",
            ParticipantRole::Moderator => "MODERATOR",
            ParticipantRole::Panelist => "PANELIST",
        }
    }

    pub fn is_moderator(&self) -> bool {
        matches!(self, ParticipantRole::Moderator)
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Rhetorical posture a participant argues from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StanceMode {
    /// Amplifies positives and opportunities.
    #[serde(rename = "echo_er")]
    Echo,
    /// Challenges assumptions and flips perspectives.
    #[serde(rename = "invert_er")]
    Invert,
    /// Explores alternative scenarios.
    #[serde(rename = "what_if_er")]
    WhatIf,
    /// Questions implications and consequences.
    #[serde(rename = "so_what_er")]
    SoWhat,
    /// Cool academic analysis.
    #[serde(rename = "cucumb_er")]
    Cucumber,
    /// Historical context and parallels.
    #[serde(rename = "archiv_er")]
    Archive,
}

impl StanceMode {
    pub const ALL: [StanceMode; 6] = [
        StanceMode::Echo,
        StanceMode::Invert,
        StanceMode::WhatIf,
        StanceMode::SoWhat,
        StanceMode::Cucumber,
        StanceMode::Archive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StanceMode::Echo => "echo_er",
            StanceMode::Invert => "invert_er",
            StanceMode::WhatIf => "what_if_er",
            StanceMode::SoWhat => "so_what_er",
            StanceMode::Cucumber => "cucumb_er",
            StanceMode::Archive => "archiv_er",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StanceMode::Echo => "Amplifies positives and opportunities",
            StanceMode::Invert => "Negates and flips perspectives",
            StanceMode::WhatIf => "Explores alternative scenarios",
            StanceMode::SoWhat => "Questions implications and consequences",
            StanceMode::Cucumber => "Cool academic analysis",
            StanceMode::Archive => "Historical context and parallels",
        }
    }

    /// Behavioural guidance injected into every turn prompt.
    pub fn guidance(&self) -> &'static str {
        match self {
            StanceMode::Echo => {
                "Focus on positive aspects and opportunities. Amplify what's working."
            }
            StanceMode::Invert => {
                "Challenge assumptions. Point out what's missing or contradictory."
            }
            StanceMode::WhatIf => "Explore alternative scenarios. Ask 'what if' questions.",
            StanceMode::SoWhat => {
                "Question implications. Ask 'so what' and demand practical impact."
            }
            StanceMode::Cucumber => "Stay analytical and composed. Provide systematic analysis.",
            StanceMode::Archive => {
                "Connect to history and precedents. Provide context from past examples."
            }
        }
    }
}

impl fmt::Display for StanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        let key = key.strip_suffix("_er").unwrap_or(&key);
        match key {
            "echo" => Ok(StanceMode::Echo),
            "invert" => Ok(StanceMode::Invert),
            "what_if" | "whatif" => Ok(StanceMode::WhatIf),
            "so_what" | "sowhat" => Ok(StanceMode::SoWhat),
            "cucumb" | "cucumber" => Ok(StanceMode::Cucumber),
            "archiv" | "archive" => Ok(StanceMode::Archive),
            _ => Err(format!(
                "unknown stance '{}' (expected one of: {})",
                s,
                StanceMode::ALL.map(|m| m.name()).join(", ")
            )),
        }
    }
}

/// Output register for generated text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StyleTone {
    Neutral,
    Technical,
    /// Short, punchy, forceful.
    Primal,
    /// Lyrical and metaphorical.
    Poetic,
    /// Witty and ironic.
    Satirical,
}

impl StyleTone {
    pub const ALL: [StyleTone; 5] = [
        StyleTone::Neutral,
        StyleTone::Technical,
        StyleTone::Primal,
        StyleTone::Poetic,
        StyleTone::Satirical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StyleTone::Neutral => "neutral",
            StyleTone::Technical => "technical",
            StyleTone::Primal => "primal",
            StyleTone::Poetic => "poetic",
            StyleTone::Satirical => "satirical",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StyleTone::Neutral => "Clear, standard language",
            StyleTone::Technical => "Precise, jargon-heavy analysis",
            StyleTone::Primal => "Short, punchy perspective",
            StyleTone::Poetic => "Lyrical, metaphorical expression",
            StyleTone::Satirical => "Witty, ironic commentary",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            StyleTone::Neutral => "Use clear, standard language. Be direct and straightforward.",
            StyleTone::Technical => {
                "Use precise, technical language. Include jargon and analytical terms where appropriate."
            }
            StyleTone::Primal => {
                "Be concise and punchy. Use short sentences. Be direct and forceful."
            }
            StyleTone::Poetic => "Use lyrical, metaphorical language. Be expressive and evocative.",
            StyleTone::Satirical => "Use wit, irony, and humor. Be clever and engaging.",
        }
    }
}

impl fmt::Display for StyleTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StyleTone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StyleTone::ALL
            .into_iter()
            .find(|tone| tone.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown tone '{}' (expected one of: {})",
                    s,
                    StyleTone::ALL.map(|t| t.name()).join(", ")
                )
            })
    }
}

/// Who produces a participant's turns.
///
/// `External` is the "a human supplies this turn" sentinel. On the wire it is
/// the model name `USER`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GeneratorIdentity {
    Model(String),
    External,
}

impl GeneratorIdentity {
    pub const EXTERNAL_SENTINEL: &'static str = "USER";

    pub fn is_external(&self) -> bool {
        matches!(self, GeneratorIdentity::External)
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            GeneratorIdentity::Model(name) => Some(name),
            GeneratorIdentity::External => None,
        }
    }
}

impl From<String> for GeneratorIdentity {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case(Self::EXTERNAL_SENTINEL) {
            GeneratorIdentity::External
        } else {
            GeneratorIdentity::Model(value)
        }
    }
}

impl From<&str> for GeneratorIdentity {
    fn from(value: &str) -> Self {
        GeneratorIdentity::from(value.to_string())
    }
}

impl From<GeneratorIdentity> for String {
    fn from(value: GeneratorIdentity) -> Self {
        match value {
            GeneratorIdentity::Model(name) => name,
            GeneratorIdentity::External => GeneratorIdentity::EXTERNAL_SENTINEL.to_string(),
        }
    }
}

impl fmt::Display for GeneratorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorIdentity::Model(name) => f.write_str(name),
            GeneratorIdentity::External => f.write_str("external input"),
        }
    }
}

/// A participant in the debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantConfig {
    /// Behavioural role within the chosen format.
    pub role: ParticipantRole,
    /// Display name for this participant.
    pub label: String,
    /// The model speaking for this participant, or the external sentinel.
    pub model: GeneratorIdentity,
    #[serde(rename = "mode")]
    pub stance: StanceMode,
    pub tone: StyleTone,
}

impl ParticipantConfig {
    /// Create a participant with the neutral defaults (`echo_er`, `neutral`).
    pub fn new(
        label: impl Into<String>,
        model: impl Into<GeneratorIdentity>,
        role: ParticipantRole,
    ) -> Self {
        Self {
            role,
            label: label.into(),
            model: model.into(),
            stance: StanceMode::Echo,
            tone: StyleTone::Neutral,
        }
    }

    pub fn with_stance(mut self, stance: StanceMode) -> Self {
        self.stance = stance;
        self
    }

    pub fn with_tone(mut self, tone: StyleTone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_role(mut self, role: ParticipantRole) -> Self {
        self.role = role;
        self
    }

    pub fn is_external(&self) -> bool {
        self.model.is_external()
    }

    /// Get the full display name with role.
    pub fn display_name_with_role(&self) -> String {
        format!("{} ({})", self.label, self.role.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_parsing_accepts_short_and_wire_names() {
        assert_eq!("echo".parse::<StanceMode>().unwrap(), StanceMode::Echo);
        assert_eq!("what_if_er".parse::<StanceMode>().unwrap(), StanceMode::WhatIf);
        assert_eq!("so-what".parse::<StanceMode>().unwrap(), StanceMode::SoWhat);
        assert_eq!("ARCHIV_ER".parse::<StanceMode>().unwrap(), StanceMode::Archive);
        assert!("sarcastic".parse::<StanceMode>().is_err());
    }

    #[test]
    fn test_tone_parsing() {
        assert_eq!("Poetic".parse::<StyleTone>().unwrap(), StyleTone::Poetic);
        assert!("loud".parse::<StyleTone>().is_err());
    }

    #[test]
    fn test_external_sentinel_round_trips_as_user() {
        let participant = ParticipantConfig::new("Human", "USER", ParticipantRole::Debater);
        assert!(participant.is_external());

        let json = serde_json::to_value(&participant).unwrap();
        assert_eq!(json["model"], "USER");
        assert_eq!(json["mode"], "echo_er");
        assert_eq!(json["role"], "debater");

        let back: ParticipantConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, participant);
    }

    #[test]
    fn test_model_identity() {
        let identity = GeneratorIdentity::from("llama3:8b");
        assert_eq!(identity.model_name(), Some("llama3:8b"));
        assert!(!identity.is_external());
        assert_eq!(GeneratorIdentity::from("user"), GeneratorIdentity::External);
    }

    #[test]
    fn test_display_name_with_role() {
        let participant = ParticipantConfig::new("Ada", "mistral", ParticipantRole::Moderator);
        assert_eq!(participant.display_name_with_role(), "Ada (MODERATOR)");
    }
}
