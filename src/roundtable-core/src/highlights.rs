//! Key-statement extraction.

use serde::{Deserialize, Serialize};

use crate::transcript::TranscriptEntry;

/// Entries shorter than this carry nothing worth highlighting.
const MIN_MEANINGFUL_CHARS: usize = 20;
const MAX_STATEMENT_CHARS: usize = 100;

/// A short highlight derived from one transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyStatement {
    pub speaker: String,
    pub text: String,
    #[serde(alias = "iteration")]
    pub round: u32,
}

/// Take the opening sentence of each turn in `entries`, in order.
///
/// Placeholders and failed turns are skipped, as is any entry whose trimmed
/// content is under 20 characters. The opening sentence itself may be
/// shorter: `"AI is powerful. It changes everything."` yields `"AI is powerful."`.
pub fn extract_key_statements(entries: &[TranscriptEntry], round: u32) -> Vec<KeyStatement> {
    entries
        .iter()
        .filter(|entry| entry.is_turn())
        .filter_map(|entry| {
            let content = entry.content.trim();
            if content.chars().count() < MIN_MEANINGFUL_CHARS {
                return None;
            }
            Some(KeyStatement {
                speaker: entry.speaker.clone(),
                text: first_sentence(content).chars().take(MAX_STATEMENT_CHARS).collect(),
                round,
            })
        })
        .collect()
}

fn first_sentence(text: &str) -> &str {
    match text.find('.') {
        Some(end) => &text[..=end],
        None => text,
    }
}
