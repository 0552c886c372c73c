//! Interactive turn-by-turn debate.
//!
//! Unlike `run`, which stops at the first human turn, `chat` asks for human
//! turns on stdin and keeps going.

use colored::Colorize;
use roundtable_core::{
    CancelHandle, DebateFormat, DebateOrchestrator, EntryKind, ParticipantConfig,
    SingleTurnRequest, TranscriptEntry,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::console;

pub struct ChatSession {
    pub topic: String,
    pub format: Option<DebateFormat>,
    pub participants: Vec<ParticipantConfig>,
    pub rounds: u32,
    pub intensity: u8,
}

/// Run every round, then let a model moderator close, then score.
pub async fn run_chat(
    orchestrator: &DebateOrchestrator,
    chat: ChatSession,
    cancel: CancelHandle,
) -> Result<Vec<TranscriptEntry>, Box<dyn std::error::Error>> {
    let mut transcript: Vec<TranscriptEntry> = Vec::new();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    'rounds: for round in 1..=chat.rounds {
        console::print_round(round, chat.rounds);

        for participant in &chat.participants {
            if cancel.is_cancelled() {
                break 'rounds;
            }

            let entry = if participant.is_external() {
                print!("{} ", format!("{}>", participant.label).bright_green().bold());
                tokio::io::stdout().flush().await?;
                match input.next_line().await? {
                    Some(line) if !line.trim().is_empty() => {
                        TranscriptEntry::new(participant, line.trim(), round)
                    }
                    Some(_) => {
                        debug!(speaker = %participant.label, "skipped turn");
                        continue;
                    }
                    None => break 'rounds,
                }
            } else {
                let outcome = orchestrator
                    .generate_turn(request(&chat, participant, &transcript, round, chat.rounds))
                    .await;
                outcome.entry
            };

            console::print_entry(&entry);
            transcript.push(entry);
        }
    }

    let closer = chat
        .participants
        .iter()
        .find(|p| p.role.is_moderator() && !p.is_external());
    if let Some(moderator) = closer {
        if !cancel.is_cancelled() && !transcript.is_empty() {
            let outcome = orchestrator
                .generate_turn(request(&chat, moderator, &transcript, chat.rounds + 1, chat.rounds))
                .await;
            console::print_entry(&outcome.entry);
            transcript.push(outcome.entry);
        }
    }

    let spoken: Vec<_> = transcript
        .iter()
        .filter(|e| e.kind == EntryKind::Turn)
        .cloned()
        .collect();
    let last_round = transcript.last().map(|e| e.round.min(chat.rounds)).unwrap_or(0);
    let analysis = orchestrator.analyze(&chat.topic, &spoken, last_round).await;

    println!();
    console::print_metrics(&analysis.metrics, analysis.success, analysis.error.as_deref());
    println!();

    Ok(transcript)
}

fn request(
    chat: &ChatSession,
    participant: &ParticipantConfig,
    prior: &[TranscriptEntry],
    round: u32,
    max_rounds: u32,
) -> SingleTurnRequest {
    SingleTurnRequest {
        topic: chat.topic.clone(),
        participant: participant.clone(),
        prior: prior.to_vec(),
        round,
        max_rounds,
        intensity: chat.intensity,
        format: chat.format,
    }
}
