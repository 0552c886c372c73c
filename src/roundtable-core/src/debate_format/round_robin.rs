use async_trait::async_trait;

use super::{DebateFormat, FormatMachine, RoundOutcome, Stage, Turn, reject_external, require_count};
use crate::error::DebateError;
use crate::participant::ParticipantConfig;
use crate::session::DebateSession;

const SETTING: &str = "participating in a round-robin discussion";

/// Everyone speaks once per round, in list order, seeing the last full lap.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinFormat;

#[async_trait]
impl FormatMachine for RoundRobinFormat {
    fn format(&self) -> DebateFormat {
        DebateFormat::RoundRobin
    }

    fn validate(&self, participants: &[ParticipantConfig]) -> Result<(), DebateError> {
        require_count(self.format(), participants, 1, None)?;
        reject_external(self.format(), participants)
    }

    async fn run_round(
        &self,
        stage: &Stage<'_>,
        session: &mut DebateSession,
        round: u32,
    ) -> RoundOutcome {
        let participants = session.participants.clone();
        let window = participants.len();

        for speaker in &participants {
            let turn = Turn::new(
                speaker,
                SETTING,
                window,
                "It's your turn. Contribute your perspective, respond to others' points, \
                 and advance the discussion",
            );
            if stage.speak(session, turn, round).await.is_none() {
                return RoundOutcome::Cancelled;
            }
        }

        RoundOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::NO_CONTEXT;
    use crate::debate_format::test_support::{drive, participant, rounds_of};
    use crate::testing::ScriptedGenerator;
    use crate::transcript::EntryKind;

    #[tokio::test]
    async fn test_everyone_speaks_once_per_round() {
        let generator = Arc::new(ScriptedGenerator::numbered());
        let participants = vec![
            participant("A", "m1"),
            participant("B", "m2"),
            participant("C", "m3"),
        ];
        let session = drive(DebateFormat::RoundRobin, participants, 2, generator.clone()).await;

        assert_eq!(rounds_of(&session), vec![1, 1, 1, 2, 2, 2]);
        let calls = generator.calls();
        assert!(calls[0].prompt.contains(NO_CONTEXT));
        // C's second turn sees the last lap only
        let last = &calls[5].prompt;
        assert!(!last.contains("A: Turn 1"));
        assert!(!last.contains("B: Turn 2"));
        assert!(last.contains("C: Turn 3"));
        assert!(last.contains("A: Turn 4"));
        assert!(last.contains("B: Turn 5"));
    }

    #[tokio::test]
    async fn test_single_participant_is_allowed() {
        let generator = Arc::new(ScriptedGenerator::numbered());
        let session =
            drive(DebateFormat::RoundRobin, vec![participant("Solo", "m")], 3, generator).await;
        assert_eq!(session.transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_speaker_leaves_placeholder_and_round_continues() {
        let generator = Arc::new(ScriptedGenerator::numbered().failing_for("broken"));
        let participants = vec![participant("A", "broken"), participant("B", "ok")];
        let session = drive(DebateFormat::RoundRobin, participants, 2, generator).await;

        assert_eq!(session.transcript.len(), 4);
        assert_eq!(session.transcript[0].kind, EntryKind::GenerationFailed);
        assert!(session.transcript[0].content.starts_with("[Error generating response:"));
        assert_eq!(session.transcript[1].kind, EntryKind::Turn);
    }

    #[test]
    fn test_empty_and_external_rosters_are_rejected() {
        assert!(RoundRobinFormat.validate(&[]).is_err());
        assert!(RoundRobinFormat.validate(&[participant("Human", "USER")]).is_err());
    }
}
