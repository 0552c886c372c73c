use async_trait::async_trait;

use super::{
    DebateFormat, FormatMachine, RoundOutcome, Stage, Turn, reject_external, require_count,
    require_position_roles,
};
use crate::context::truncate_chars;
use crate::error::DebateError;
use crate::participant::ParticipantConfig;
use crate::session::DebateSession;

const SETTING_EXAMINER: &str = "an examiner in a many-on-one examination";
const SETTING_EXAMINEE: &str = "the examinee in a many-on-one examination";
const EXAMINER_WINDOW: usize = 5;
const EXAMINEE_WINDOW: usize = 10;
/// How much of the examinee's latest answer each examiner is quoted.
const POSITION_PREVIEW_CHARS: usize = 200;

/// A panel of examiners takes turns questioning a single examinee, who then
/// answers all of the round's questions at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyOnOneFormat;

#[async_trait]
impl FormatMachine for ManyOnOneFormat {
    fn format(&self) -> DebateFormat {
        DebateFormat::ManyOnOne
    }

    fn validate(&self, participants: &[ParticipantConfig]) -> Result<(), DebateError> {
        require_count(self.format(), participants, 2, None)?;
        require_position_roles(self.format(), participants)?;
        reject_external(self.format(), participants)
    }

    async fn open(&self, stage: &Stage<'_>, session: &mut DebateSession) -> RoundOutcome {
        let examinee = session.participants[0].clone();
        let turn = Turn::new(
            &examinee,
            SETTING_EXAMINEE,
            EXAMINEE_WINDOW,
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
        let examinee = session.participants[0].clone();
        let examiners = session.participants[1..].to_vec();

        let position = session
            .last_from(&examinee.label)
            .map(|entry| truncate_chars(&entry.content, POSITION_PREVIEW_CHARS))
            .unwrap_or_default();

        let mut questions = Vec::with_capacity(examiners.len());
        for examiner in &examiners {
            let ask = Turn::new(
                examiner,
                SETTING_EXAMINER,
                EXAMINER_WINDOW,
                "Ask a probing question or present a challenge",
            )
            .situation(format!("{}'s current position: {}", examinee.label, position));
            let Some(question) = stage.speak(session, ask, round).await else {
                return RoundOutcome::Cancelled;
            };
            questions.push(format!("{}: {}", examiner.label, question));
        }

        let answer = Turn::new(
            &examinee,
            SETTING_EXAMINEE,
            EXAMINEE_WINDOW,
            "Respond to all examiners' questions and challenges",
        )
        .situation(format!("Questions from examiners:\n{}", questions.join("\n\n")));
        match stage.speak(session, answer, round).await {
            Some(_) => RoundOutcome::Continue,
            None => RoundOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::debate_format::test_support::{drive, participant, rounds_of};
    use crate::participant::ParticipantRole;
    use crate::testing::ScriptedGenerator;

    fn lineup() -> Vec<ParticipantConfig> {
        DebateFormat::ManyOnOne.assign_roles(vec![
            participant("Candidate", "target"),
            participant("Q1", "e1"),
            participant("Q2", "e2"),
            participant("Q3", "e3"),
        ])
    }

    #[tokio::test]
    async fn test_each_round_is_all_questions_then_one_answer() {
        let generator = Arc::new(ScriptedGenerator::numbered());
        let session = drive(DebateFormat::ManyOnOne, lineup(), 2, generator.clone()).await;

        // opening plus 3 questions and 1 answer per round
        assert_eq!(session.transcript.len(), 1 + 4 * 2);
        assert_eq!(rounds_of(&session), vec![0, 1, 1, 1, 1, 2, 2, 2, 2]);
        let speakers: Vec<_> = session.transcript[5..].iter().map(|e| e.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["Q1", "Q2", "Q3", "Candidate"]);
        assert_eq!(session.transcript[8].role, ParticipantRole::Examinee);
    }

    #[tokio::test]
    async fn test_examinee_sees_every_question_of_the_round_in_full() {
        let generator = Arc::new(ScriptedGenerator::numbered());
        let session = drive(DebateFormat::ManyOnOne, lineup(), 2, generator.clone()).await;

        let calls = generator.calls();
        let answer_prompt = &calls[8].prompt;
        assert_eq!(calls[8].model, "target");
        for entry in &session.transcript[5..8] {
            assert!(answer_prompt.contains(&format!("{}: {}", entry.speaker, entry.content)));
        }
        assert!(answer_prompt.contains("Questions from examiners:"));
    }

    #[test]
    fn test_examinee_must_come_first() {
        let mut participants = lineup();
        participants.swap(0, 1);
        assert!(ManyOnOneFormat.validate(&participants).is_err());
        assert!(ManyOnOneFormat.validate(&lineup()[..1]).is_err());
    }
}
