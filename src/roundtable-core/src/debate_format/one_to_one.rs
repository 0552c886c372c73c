use async_trait::async_trait;

use super::{DebateFormat, FormatMachine, RoundOutcome, Stage, Turn, require_count};
use crate::error::DebateError;
use crate::participant::ParticipantConfig;
use crate::session::DebateSession;

const SETTING: &str = "participating in a one-to-one debate";
const INSTRUCTION: &str = "Respond to your opponent. Be argumentative but constructive, \
                           and aim to persuade while acknowledging valid points";
const WINDOW: usize = 3;

/// Two debaters alternate, each answering the other's latest statement.
///
/// Either side may be a human. When a human's turn comes up the machine leaves
/// a placeholder and suspends the whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneToOneFormat;

#[async_trait]
impl FormatMachine for OneToOneFormat {
    fn format(&self) -> DebateFormat {
        DebateFormat::OneToOne
    }

    fn validate(&self, participants: &[ParticipantConfig]) -> Result<(), DebateError> {
        require_count(self.format(), participants, 2, Some(2))
    }

    async fn run_round(
        &self,
        stage: &Stage<'_>,
        session: &mut DebateSession,
        round: u32,
    ) -> RoundOutcome {
        let debaters = session.participants.clone();

        for (i, speaker) in debaters.iter().enumerate() {
            let opponent = &debaters[1 - i];

            if speaker.is_external() {
                session.suspend(stage.await_input(speaker, round));
                return RoundOutcome::Suspended;
            }

            let situation = match session.last_from(&opponent.label) {
                Some(entry) => format!("{} just said:\n{}", opponent.label, entry.content),
                None => "(Opening statement)".to_string(),
            };
            let turn = Turn::new(speaker, SETTING, WINDOW, INSTRUCTION).situation(situation);
            if stage.speak(session, turn, round).await.is_none() {
                return RoundOutcome::Cancelled;
            }
        }

        RoundOutcome::Continue
    }

    /// Every second round, over the last two exchanges.
    fn checkpoint(&self, round: u32, _produced: usize) -> Option<usize> {
        (round > 0 && round % 2 == 0).then_some(4)
    }
}
