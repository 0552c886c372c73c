//! Console rendering for debate events and results.

use colored::Colorize;
use roundtable_core::debate_format::available_formats;
use roundtable_core::{
    DebateEvent, DebateMetrics, DebateResult, EntryKind, KeyStatement,
    ParticipantConfig, StanceMode, StyleTone, TranscriptEntry,
};

const RULE_WIDTH: usize = 70;
const WRAP_WIDTH: usize = 66;

pub fn print_header(title: &str, topic: &str, participants: &[ParticipantConfig]) {
    println!();
    println!("{}", "═".repeat(RULE_WIDTH).bright_blue());
    println!(
        "{}",
        format!("  {} - {}", "Roundtable".bold(), title)
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(RULE_WIDTH).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), topic.bright_white());
    println!();
    println!("{}", "Participants:".bold());
    for (i, p) in participants.iter().enumerate() {
        println!(
            "  {}. {} - {} [{}, {}]",
            i + 1,
            p.display_name_with_role().bright_cyan(),
            p.model.to_string().dimmed(),
            p.stance,
            p.tone
        );
    }
    println!();
    println!("{}", "─".repeat(RULE_WIDTH).dimmed());
}

pub fn print_round(round: u32, max_rounds: u32) {
    println!();
    println!("{}", "═".repeat(RULE_WIDTH).bright_magenta());
    println!(
        "{}",
        format!("  ROUND {} of {}", round, max_rounds)
            .bright_magenta()
            .bold()
    );
    println!("{}", "═".repeat(RULE_WIDTH).bright_magenta());
    println!();
}

pub fn print_entry(entry: &TranscriptEntry) {
    print_speaker(&entry.speaker, entry.role.display_name());
    print_content(&entry.content, entry.kind);
}

fn print_speaker(name: &str, role: &str) {
    println!(
        "{} {} {}",
        "▶".bright_cyan(),
        name.bright_cyan().bold(),
        format!("({})", role).yellow()
    );
}

fn print_content(content: &str, kind: EntryKind) {
    let wrapped = textwrap(content, WRAP_WIDTH);
    for line in wrapped.lines() {
        match kind {
            EntryKind::Turn => println!("  {}", line),
            EntryKind::GenerationFailed => println!("  {}", line.red()),
            EntryKind::AwaitingInput => println!("  {}", line.dimmed().italic()),
        }
    }
    println!();
}

/// Create a callback that prints debate events to the console.
pub fn create_console_callback() -> Box<dyn Fn(DebateEvent) + Send + Sync> {
    Box::new(move |event| match event {
        DebateEvent::RoundStart { round, max_rounds } => print_round(round, max_rounds),
        DebateEvent::SpeakerStart { name, role, .. } => print_speaker(&name, role.display_name()),
        DebateEvent::SpeakerMessage { content, kind, .. } => print_content(&content, kind),
        DebateEvent::AwaitingInput { name, round } => {
            println!(
                "{} {}",
                "⏸".yellow(),
                format!("Waiting for {} to speak (round {})", name, round).yellow()
            );
            println!();
        }
        DebateEvent::DebateEnd { .. } => {
            // Handled in main
        }
    })
}

pub fn print_metrics(metrics: &DebateMetrics, success: bool, error: Option<&str>) {
    println!("{}", "Metrics:".bold());
    println!(
        "  Agreement:   {}",
        format!("{:.1}/10", metrics.agreement_score).bright_white().bold()
    );
    println!("  Convergence: {}", metrics.convergence);
    println!("  Sensitivity: {}", metrics.emotional_sensitivity);
    println!("  Bias:        {}", metrics.bias_level);
    println!("  Topic drift: {}", metrics.topic_drift);
    if !success {
        println!(
            "  {} {}",
            "Analysis fell back to baseline:".yellow(),
            error.unwrap_or("unknown reason")
        );
    }
}

pub fn print_key_statements(statements: &[KeyStatement]) {
    if statements.is_empty() {
        return;
    }
    println!();
    println!("{}", "Key statements:".bold());
    for statement in statements {
        println!(
            "  [{}] {}: {}",
            statement.round,
            statement.speaker.bright_cyan(),
            statement.text
        );
    }
}

pub fn print_summary(result: &DebateResult) {
    println!();
    println!("{}", "═".repeat(RULE_WIDTH).bright_blue());
    let headline = if result.cancelled {
        "  Debate cancelled.".yellow().bold()
    } else if result.awaiting_external_input {
        "  Debate paused for external input.".yellow().bold()
    } else {
        "  Debate concluded.".bright_green().bold()
    };
    println!("{}", headline);
    println!("{}", "═".repeat(RULE_WIDTH).bright_blue());
    println!();

    print_metrics(
        &result.metrics,
        result.analysis.success,
        result.analysis.error.as_deref(),
    );
    let verdict = if result.convergence_reached {
        "reached".bright_green()
    } else {
        "not reached".dimmed()
    };
    println!("  Convergence threshold {}", verdict);
    print_key_statements(&result.key_statements);
    println!();
}

pub fn print_styles() {
    println!("{}", "Stance modes:".bold());
    for stance in StanceMode::ALL {
        println!("  {:<12} {}", stance.name().bright_cyan(), stance.description());
    }
    println!();
    println!("{}", "Style tones:".bold());
    for tone in StyleTone::ALL {
        println!("  {:<12} {}", tone.name().bright_cyan(), tone.description());
    }
}

pub fn format_names() -> String {
    available_formats().join(", ")
}

/// Simple text wrapping function.
pub fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_line_len + word_len + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word_len;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textwrap_breaks_on_width() {
        let wrapped = textwrap("one two three four five", 9);
        assert_eq!(wrapped, "one two\nthree\nfour five");
    }

    #[test]
    fn test_textwrap_keeps_long_words_whole() {
        let wrapped = textwrap("supercalifragilistic is long", 10);
        assert_eq!(wrapped.lines().next(), Some("supercalifragilistic"));
    }

    #[test]
    fn test_format_names_lists_every_format() {
        assert_eq!(
            format_names(),
            "one-to-one, cross-exam, many-on-one, panel, round-robin"
        );
    }
}
