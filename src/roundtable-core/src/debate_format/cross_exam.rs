use async_trait::async_trait;

use super::{
    DebateFormat, FormatMachine, RoundOutcome, Stage, Turn, reject_external, require_count,
    require_position_roles,
};
use crate::error::DebateError;
use crate::participant::ParticipantConfig;
use crate::session::DebateSession;

const SETTING_EXAMINER: &str = "the examiner in a cross-examination";
const SETTING_EXAMINEE: &str = "the examinee in a cross-examination";
const WINDOW: usize = 3;

/// One examiner questions one examinee, after the examinee states a position.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossExamFormat;

#[async_trait]
impl FormatMachine for CrossExamFormat {
    fn format(&self) -> DebateFormat {
        DebateFormat::CrossExam
    }

    fn validate(&self, participants: &[ParticipantConfig]) -> Result<(), DebateError> {
        require_count(self.format(), participants, 2, Some(2))?;
        require_position_roles(self.format(), participants)?;
        reject_external(self.format(), participants)
    }

    async fn open(&self, stage: &Stage<'_>, session: &mut DebateSession) -> RoundOutcome {
        let examinee = session.participants[1].clone();
        let turn = Turn::new(
            &examinee,
            SETTING_EXAMINEE,
            WINDOW,
            "State your position on the topic",
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
        let examiner = session.participants[0].clone();
        let examinee = session.participants[1].clone();

        let position = session
            .last_from(&examinee.label)
            .map(|entry| entry.content.clone())
            .unwrap_or_default();
        let ask = Turn::new(
            &examiner,
            SETTING_EXAMINER,
            WINDOW,
            "Generate a probing question or challenge to the examinee's position",
        )
        .situation(format!("{}'s position:\n{}", examinee.label, position));
        let Some(question) = stage.speak(session, ask, round).await else {
            return RoundOutcome::Cancelled;
        };

        let answer = Turn::new(
            &examinee,
            SETTING_EXAMINEE,
            WINDOW,
            "Respond to the examiner's question or challenge. Defend or refine your position",
        )
        .situation(format!("{} asks:\n{}", examiner.label, question));
        match stage.speak(session, answer, round).await {
            Some(_) => RoundOutcome::Continue,
            None => RoundOutcome::Cancelled,
        }
    }
}
