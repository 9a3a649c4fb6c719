use crate::error::{Error, GenerationError, Result};
use crate::models::answer::AnswerEvent;
use crate::models::question::PublicQuestion;
use crate::models::quiz_config::{QuestionStyle, QuizConfig};
use crate::models::quiz_session::RoundFeedback;
use crate::services::ai_service::QuestionGenerator;
use crate::services::parser_service;
use crate::services::prompt_service::build_prompt;
use crate::services::session_service::SessionHandle;
use chrono::Utc;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

/// Runs the generate -> parse -> install part of a round and hands answers
/// to the session.
#[derive(Clone)]
pub struct QuizService {
    generator: Arc<dyn QuestionGenerator>,
    model: String,
    generation_timeout: Duration,
}

impl QuizService {
    pub fn new(
        generator: Arc<dyn QuestionGenerator>,
        model: String,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            model,
            generation_timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the question for the session's current round, generating it
    /// if none is pending. A failed generation or parse leaves the session
    /// untouched so the round can be retried.
    pub async fn next_question(&self, handle: &SessionHandle) -> Result<PublicQuestion> {
        let (config, difficulty, asked, round, session_id) = {
            let session = handle.lock().await;
            session.ensure_in_progress()?;
            if let Some(pending) = session.pending_question() {
                return Ok(pending.to_public(session.round()));
            }
            (
                session.config().clone(),
                session.difficulty(),
                session.asked_concepts(),
                session.round(),
                session.id(),
            )
        };

        let style = pick_style(&config);
        let prompt = build_prompt(&config, difficulty, &asked, style);
        tracing::info!(%session_id, round, %difficulty, %style, model = %self.model, "Generating question");

        let raw = match tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(&prompt, &self.model),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(%session_id, round, error = %e, "Question generation failed");
                return Err(e.into());
            }
            Err(_) => {
                let e = GenerationError::Timeout(self.generation_timeout.as_secs());
                tracing::warn!(%session_id, round, error = %e, "Question generation timed out");
                return Err(e.into());
            }
        };

        let mut question = parser_service::parse(&raw)
            .map_err(|e| {
                tracing::warn!(%session_id, round, error = %e, "Generated question rejected");
                Error::Parse(e)
            })?
            .generated_at(difficulty, style);
        if config.shuffle_options {
            question.shuffle_options(&mut rand::thread_rng());
        }

        let mut session = handle.lock().await;
        session.ensure_in_progress()?;
        if session.round() != round {
            return Err(Error::Conflict(format!(
                "round {} finished while its question was being generated",
                round
            )));
        }
        // A concurrent request may have installed a question first.
        if let Some(pending) = session.pending_question() {
            return Ok(pending.to_public(round));
        }
        let installed = session.begin_round(question)?;
        Ok(installed.to_public(round))
    }

    /// Scores an answer. Without a client-reported elapsed time the server
    /// measures it from when the question was issued.
    pub async fn submit_answer(
        &self,
        handle: &SessionHandle,
        selected_option: Option<usize>,
        elapsed_secs: Option<f64>,
    ) -> Result<RoundFeedback> {
        let mut session = handle.lock().await;
        let elapsed_secs = match elapsed_secs {
            Some(secs) => secs,
            None => session
                .pending_issued_at()
                .map(|issued| (Utc::now() - issued).num_milliseconds().max(0) as f64 / 1000.0)
                .unwrap_or(0.0),
        };
        session.submit(AnswerEvent {
            selected_option,
            elapsed_secs,
        })
    }
}

fn pick_style(config: &QuizConfig) -> QuestionStyle {
    config
        .question_styles
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(QuestionStyle::DescriptiveAndExplained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::difficulty::DifficultyLevel;
    use crate::models::quiz_session::{QuizSession, SessionPhase};
    use crate::services::ai_service::MockQuestionGenerator;
    use async_trait::async_trait;
    use mockall::Sequence;
    use tokio::sync::Mutex;

    const WELL_FORMED: &str = "QUESTION: Which index type suits range scans?\n\
        A) Hash\nB) B-tree\nC) Bitmap\nD) None\nANSWER: B\n\
        EXPLANATION: B-trees keep keys ordered.\nCONCEPT: Indexing";

    fn service(generator: impl QuestionGenerator + 'static) -> QuizService {
        QuizService::new(
            Arc::new(generator),
            "llama3-70b-8192".to_string(),
            Duration::from_secs(5),
        )
    }

    fn handle(question_count: u32) -> SessionHandle {
        let mut session =
            QuizSession::new(QuizConfig::new("Backend Engineer", 3, question_count, 30)).unwrap();
        session.start().unwrap();
        Arc::new(Mutex::new(session))
    }

    #[tokio::test]
    async fn generates_and_stamps_the_question() {
        let mut generator = MockQuestionGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt, model| {
                prompt.contains("Backend Engineer") && model == "llama3-70b-8192"
            })
            .times(1)
            .returning(|_, _| Ok(WELL_FORMED.to_string()));

        let service = service(generator);
        let session = handle(3);
        let question = service.next_question(&session).await.unwrap();
        assert_eq!(question.round, 1);
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.difficulty, DifficultyLevel::Beginner);
        assert!(question.style.is_some());

        // Asking again returns the pending question without a second call.
        let again = service.next_question(&session).await.unwrap();
        assert_eq!(again, question);
    }

    #[tokio::test]
    async fn generation_error_on_round_two_keeps_round_one_and_allows_retry() {
        let mut generator = MockQuestionGenerator::new();
        let mut seq = Sequence::new();
        generator
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(WELL_FORMED.to_string()));
        generator
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(GenerationError::Unreachable("connection refused".into())));
        generator
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(WELL_FORMED.to_string()));

        let service = service(generator);
        let session = handle(3);

        service.next_question(&session).await.unwrap();
        let feedback = service.submit_answer(&session, Some(1), Some(4.0)).await.unwrap();
        assert!(feedback.correct);

        let err = service.next_question(&session).await.unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::Unreachable(_))));
        {
            let s = session.lock().await;
            assert_eq!(s.phase(), SessionPhase::InProgress);
            assert_eq!(s.round(), 2);
            assert_eq!(s.score(), 1);
            assert_eq!(s.difficulty(), DifficultyLevel::Intermediate);
            assert_eq!(s.history().len(), 1);
            assert!(s.pending_question().is_none());
        }

        let retried = service.next_question(&session).await.unwrap();
        assert_eq!(retried.round, 2);
        assert_eq!(retried.difficulty, DifficultyLevel::Intermediate);
        assert_eq!(session.lock().await.history().len(), 1);
    }

    #[tokio::test]
    async fn malformed_output_is_a_round_level_parse_error() {
        let mut generator = MockQuestionGenerator::new();
        generator
            .expect_generate()
            .returning(|_, _| Ok("QUESTION: Pick\nA) x\nB) y\nC) z\nANSWER: D".to_string()));

        let service = service(generator);
        let session = handle(2);
        let err = service.next_question(&session).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        let s = session.lock().await;
        assert_eq!(s.round(), 1);
        assert!(s.pending_question().is_none());
    }

    struct SlowGenerator;

    #[async_trait]
    impl QuestionGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str, _model: &str) -> std::result::Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(WELL_FORMED.to_string())
        }
    }

    #[tokio::test]
    async fn slow_generation_is_cut_off() {
        let service = QuizService::new(
            Arc::new(SlowGenerator),
            "llama3-70b-8192".to_string(),
            Duration::from_millis(50),
        );
        let session = handle(2);
        let err = service.next_question(&session).await.unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::Timeout(_))));
        assert_eq!(session.lock().await.round(), 1);
    }

    #[tokio::test]
    async fn server_measures_elapsed_time_when_client_omits_it() {
        let mut generator = MockQuestionGenerator::new();
        generator
            .expect_generate()
            .returning(|_, _| Ok(WELL_FORMED.to_string()));

        let service = service(generator);
        let session = handle(1);
        service.next_question(&session).await.unwrap();
        let feedback = service.submit_answer(&session, Some(1), None).await.unwrap();
        assert!(feedback.correct);
        assert!(feedback.elapsed_secs < 30.0);
        assert!(feedback.completed);

        let err = service.next_question(&session).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn shuffled_options_keep_the_answer() {
        let mut generator = MockQuestionGenerator::new();
        generator
            .expect_generate()
            .returning(|_, _| Ok(WELL_FORMED.to_string()));

        let service = service(generator);
        let mut config = QuizConfig::new("DBA", 8, 1, 30);
        config.shuffle_options = true;
        let mut session = QuizSession::new(config).unwrap();
        session.start().unwrap();
        let session = Arc::new(Mutex::new(session));

        let public = service.next_question(&session).await.unwrap();
        let correct = session.lock().await.pending_question().unwrap().correct_option;
        assert_eq!(public.options[correct].text, "B-tree");
    }
}
