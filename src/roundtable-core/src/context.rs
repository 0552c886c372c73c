//! Context window assembly.
//!
//! Decides how much of the transcript a participant sees before speaking.
//! Moderators get the full, untruncated history so they can reference every
//! speaker; everyone else gets a short, truncated tail.

use crate::participant::ParticipantRole;
use crate::transcript::TranscriptEntry;

pub const NO_CONTEXT: &str = "(no previous context)";
pub const TRUNCATION_MARKER: &str = "...";

/// Bounds on what a non-moderator viewer sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    /// How many of the most recent entries are shown.
    pub recent: usize,
    /// Per-entry character budget before truncation.
    pub char_budget: usize,
}

impl ContextWindow {
    pub fn new(recent: usize, char_budget: usize) -> Self {
        Self {
            recent,
            char_budget,
        }
    }
}

/// Render the slice of `entries` visible to a viewer with `viewer` role.
pub fn build_context(
    entries: &[TranscriptEntry],
    viewer: ParticipantRole,
    window: ContextWindow,
) -> String {
    if entries.is_empty() {
        return NO_CONTEXT.to_string();
    }

    if viewer.is_moderator() {
        return entries
            .iter()
            .map(|entry| format!("{}: {}", entry.speaker, entry.content))
            .collect::<Vec<_>>()
            .join("\n\n");
    }

    let start = entries.len().saturating_sub(window.recent);
    let visible = &entries[start..];
    if visible.is_empty() {
        return NO_CONTEXT.to_string();
    }

    visible
        .iter()
        .map(|entry| {
            format!(
                "{}: {}",
                entry.speaker,
                truncate_chars(&entry.content, window.char_budget)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cut `text` to `budget` characters, marking the cut.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantConfig;

    fn transcript(count: usize, content_len: usize) -> Vec<TranscriptEntry> {
        let speaker = ParticipantConfig::new("Speaker", "llama3", ParticipantRole::Panelist);
        (0..count)
            .map(|i| {
                let body = format!("{}{}", i, "x".repeat(content_len));
                let mut entry = TranscriptEntry::new(&speaker, body, i as u32);
                entry.speaker = format!("S{}", i);
                entry
            })
            .collect()
    }

    #[test]
    fn test_empty_transcript_gives_sentinel() {
        let text = build_context(&[], ParticipantRole::Debater, ContextWindow::new(3, 300));
        assert_eq!(text, NO_CONTEXT);
        let text = build_context(&[], ParticipantRole::Moderator, ContextWindow::new(3, 300));
        assert_eq!(text, NO_CONTEXT);
    }

    #[test]
    fn test_moderator_sees_everything_untruncated() {
        let entries = transcript(8, 500);
        let text = build_context(&entries, ParticipantRole::Moderator, ContextWindow::new(3, 200));
        for entry in &entries {
            assert!(text.contains(&format!("{}: {}", entry.speaker, entry.content)));
        }
        assert!(!text.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_debater_sees_recent_window_truncated() {
        let entries = transcript(8, 500);
        let text = build_context(&entries, ParticipantRole::Debater, ContextWindow::new(3, 200));
        assert!(!text.contains("S4:"));
        assert!(text.starts_with("S5: "));
        assert!(text.contains("S7: "));
        assert_eq!(text.matches(TRUNCATION_MARKER).count(), 3);
        let first_block = text.split("\n\n").next().unwrap();
        assert_eq!(first_block.chars().count(), "S5: ".len() + 200 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_short_entries_are_not_marked() {
        let entries = transcript(2, 10);
        let text = build_context(&entries, ParticipantRole::Examiner, ContextWindow::new(5, 300));
        assert!(!text.contains(TRUNCATION_MARKER));
        assert_eq!(text.split("\n\n").count(), 2);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let text = "ééééé";
        assert_eq!(truncate_chars(text, 3), "ééé...");
        assert_eq!(truncate_chars(text, 5), "ééééé");
    }

    #[test]
    fn test_zero_window_gives_sentinel() {
        let entries = transcript(2, 10);
        let text = build_context(&entries, ParticipantRole::Debater, ContextWindow::new(0, 300));
        assert_eq!(text, NO_CONTEXT);
    }
}
