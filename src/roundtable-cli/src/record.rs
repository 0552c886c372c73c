//! Markdown transcript records.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use roundtable_core::DebateResult;

/// `debate_<format>_<YYYY-MM-DDTHH-MM-SS>.md`
pub fn record_file_name(result: &DebateResult, at: DateTime<Utc>) -> String {
    format!(
        "debate_{}_{}.md",
        result.format.name(),
        at.format("%Y-%m-%dT%H-%M-%S")
    )
}

pub fn render_record(result: &DebateResult, intensity: u8, at: DateTime<Utc>) -> String {
    let mut md = format!(
        "# Roundtable - {}\n\n**Topic:** {}\n\n**Date:** {}\n\n**Intensity:** {}/10\n\n## Participants\n\n",
        result.format.display_name(),
        result.topic,
        at.format("%Y-%m-%d %H:%M:%S UTC"),
        intensity
    );

    for p in &result.participants {
        md.push_str(&format!(
            "- **{}** ({}): {} ({} mode, {} tone)\n",
            p.label,
            p.role.display_name(),
            p.model,
            p.stance,
            p.tone
        ));
    }

    md.push_str("\n---\n\n## Transcript\n\n");
    for entry in &result.transcript {
        let turn = if entry.round > 0 {
            format!(" [Turn {}]", entry.round)
        } else {
            String::new()
        };
        md.push_str(&format!("### {}{}\n\n{}\n\n---\n\n", entry.speaker, turn, entry.content));
    }

    md.push_str(&format!(
        "\n**Agreement:** {:.1}/10 ({})\n\n*Generated by Roundtable*\n",
        result.metrics.agreement_score, result.metrics.convergence
    ));
    md
}

/// Write the record into `dir`, creating it if needed.
pub fn write_record(dir: &Path, result: &DebateResult, intensity: u8) -> io::Result<PathBuf> {
    let now = Utc::now();
    fs::create_dir_all(dir)?;
    let path = dir.join(record_file_name(result, now));
    fs::write(&path, render_record(result, intensity, now))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use roundtable_core::metrics::DebateMetrics;
    use roundtable_core::orchestrator::AnalysisStatus;
    use roundtable_core::{DebateFormat, ParticipantConfig, ParticipantRole, TranscriptEntry};

    fn result() -> DebateResult {
        let host = ParticipantConfig::new("Host", "gemma3:27b", ParticipantRole::Moderator);
        let guest = ParticipantConfig::new("Guest", "llama3", ParticipantRole::Panelist);
        DebateResult {
            topic: "Four-day weeks".to_string(),
            format: DebateFormat::Panel,
            transcript: vec![
                TranscriptEntry::new(&host, "Welcome, everyone.", 0),
                TranscriptEntry::new(&guest, "Productivity rises.", 1),
            ],
            participants: vec![host, guest],
            metrics: DebateMetrics::baseline(1),
            key_statements: Vec::new(),
            completed: true,
            convergence_reached: false,
            awaiting_external_input: false,
            cancelled: false,
            analysis: AnalysisStatus {
                success: true,
                error: None,
            },
        }
    }

    #[test]
    fn test_file_name_uses_format_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(record_file_name(&result(), at), "debate_panel_2025-03-09T14-05-07.md");
    }

    #[test]
    fn test_render_layout() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        let md = render_record(&result(), 7, at);

        assert!(md.starts_with("# Roundtable - Moderated Panel\n"));
        assert!(md.contains("**Topic:** Four-day weeks"));
        assert!(md.contains("**Date:** 2025-03-09 14:05:07 UTC"));
        assert!(md.contains("**Intensity:** 7/10"));
        assert!(md.contains("- **Host** (MODERATOR): gemma3:27b (echo_er mode, neutral tone)"));
        // openings carry no turn label
        assert!(md.contains("### Host\n\nWelcome, everyone."));
        assert!(md.contains("### Guest [Turn 1]\n\nProductivity rises."));
    }
}
