use async_trait::async_trait;

use super::{
    DebateFormat, FormatMachine, RoundOutcome, Stage, Turn, require_count, require_position_roles,
};
use crate::error::DebateError;
use crate::participant::ParticipantConfig;
use crate::session::DebateSession;

const SETTING_MODERATOR: &str = "the moderator of a panel discussion";
const SETTING_PANELIST: &str = "a panelist in a moderated panel discussion";
const PANELIST_WINDOW: usize = 5;

/// A moderator opens, panelists speak every round, and the moderator sums up
/// every second round.
///
/// The moderator may be a human. Their opening becomes a placeholder and the
/// periodic summaries are skipped, but the panel still runs to the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelFormat;

#[async_trait]
impl FormatMachine for PanelFormat {
    fn format(&self) -> DebateFormat {
        DebateFormat::Panel
    }

    fn validate(&self, participants: &[ParticipantConfig]) -> Result<(), DebateError> {
        require_count(self.format(), participants, 2, None)?;
        require_position_roles(self.format(), participants)?;
        match participants[1..].iter().find(|p| p.is_external()) {
            Some(p) => Err(DebateError::invalid(format!(
                "only the moderator of a panel may be external, not '{}'",
                p.label
            ))),
            None => Ok(()),
        }
    }

    async fn open(&self, stage: &Stage<'_>, session: &mut DebateSession) -> RoundOutcome {
        let moderator = session.participants[0].clone();
        if moderator.is_external() {
            session.push(stage.await_input(&moderator, 0));
            return RoundOutcome::Continue;
        }

        let turn = Turn::new(
            &moderator,
            SETTING_MODERATOR,
            0,
            "Open the panel discussion. Introduce the topic and set the tone for productive dialogue",
        );
        match stage.speak(session, turn, 0).await {
            Some(_) => RoundOutcome::Continue,
            None => RoundOutcome::Cancelled,
        }
    }

    async fn run_round(
        &self,
        stage: &Stage<'_>,
        session: &mut DebateSession,
        round: u32,
    ) -> RoundOutcome {
        let moderator = session.participants[0].clone();
        let panelists = session.participants[1..].to_vec();

        // Only a real opening counts as guidance.
        let guidance = session
            .transcript
            .first()
            .filter(|entry| entry.is_turn())
            .map(|entry| format!("Moderator's guidance:\n{}", entry.content));

        for panelist in &panelists {
            let mut turn = Turn::new(
                panelist,
                SETTING_PANELIST,
                PANELIST_WINDOW,
                "Share your perspective and respond to others' points",
            );
            if let Some(guidance) = &guidance {
                turn = turn.situation(guidance.clone());
            }
            if stage.speak(session, turn, round).await.is_none() {
                return RoundOutcome::Cancelled;
            }
        }

        if round % 2 == 0 && !moderator.is_external() {
            let summary = Turn::new(
                &moderator,
                SETTING_MODERATOR,
                0,
                "Summarize key points, identify areas of agreement and disagreement, \
                 and guide the next phase of discussion",
            );
            if stage.speak(session, summary, round).await.is_none() {
                return RoundOutcome::Cancelled;
            }
        }

        RoundOutcome::Continue
    }
}
