use crate::error::{Error, Result};
use crate::models::answer::{AnswerEvent, AnswerOutcome, RoundRecord};
use crate::models::difficulty::DifficultyLevel;
use crate::models::question::Question;
use crate::models::quiz_config::QuizConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Configuring,
    InProgress,
    Completed,
}

#[derive(Debug, Clone)]
struct PendingQuestion {
    question: Question,
    issued_at: DateTime<Utc>,
}

/// Everything revealed after an answer is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundFeedback {
    pub round: u32,
    pub outcome: AnswerOutcome,
    pub correct: bool,
    pub selected_option: Option<usize>,
    pub correct_option: usize,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub concept: String,
    pub elapsed_secs: f64,
    pub score: u32,
    pub difficulty: DifficultyLevel,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub session_id: Uuid,
    pub score: u32,
    pub max_score: u32,
    pub accuracy_percent: f64,
    pub initial_difficulty: DifficultyLevel,
    pub final_difficulty: DifficultyLevel,
    pub concepts_covered: Vec<String>,
    pub average_answer_secs: Option<f64>,
    pub ended_early: bool,
    pub rounds: Vec<RoundRecord>,
}

/// State of one user's quiz run.
///
/// Lifecycle is `Configuring -> InProgress -> Completed`. Each round is a
/// `begin_round` followed by a `submit`; failures before `begin_round`
/// (generation, parsing) leave the session exactly as it was.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    config: QuizConfig,
    phase: SessionPhase,
    difficulty: DifficultyLevel,
    score: u32,
    round: u32,
    pending: Option<PendingQuestion>,
    history: Vec<RoundRecord>,
    ended_early: bool,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(config: QuizConfig) -> Result<Self> {
        config.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            difficulty: config.initial_difficulty,
            config,
            phase: SessionPhase::Configuring,
            score: 0,
            round: 0,
            pending: None,
            history: Vec::new(),
            ended_early: false,
            created_at: now,
            last_activity: now,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Configuring {
            return Err(Error::Conflict("quiz has already been started".to_string()));
        }
        self.phase = SessionPhase::InProgress;
        self.difficulty = self.config.initial_difficulty;
        self.score = 0;
        self.round = 1;
        self.touch();
        tracing::info!(
            session_id = %self.id,
            questions = self.config.question_count,
            difficulty = %self.difficulty,
            "Quiz started"
        );
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn pending_question(&self) -> Option<&Question> {
        self.pending.as_ref().map(|p| &p.question)
    }

    pub fn pending_issued_at(&self) -> Option<DateTime<Utc>> {
        self.pending.as_ref().map(|p| p.issued_at)
    }

    /// Distinct concept labels from the history, oldest first.
    pub fn asked_concepts(&self) -> Vec<String> {
        let mut concepts: Vec<String> = Vec::new();
        for record in &self.history {
            let label = record.question.concept_label();
            if !concepts.iter().any(|c| c.eq_ignore_ascii_case(label)) {
                concepts.push(label.to_string());
            }
        }
        concepts
    }

    pub fn ensure_in_progress(&self) -> Result<()> {
        match self.phase {
            SessionPhase::InProgress => Ok(()),
            SessionPhase::Configuring => {
                Err(Error::Conflict("quiz has not been started".to_string()))
            }
            SessionPhase::Completed => {
                Err(Error::Conflict("quiz is already completed".to_string()))
            }
        }
    }

    /// Installs the question for the current round.
    pub fn begin_round(&mut self, question: Question) -> Result<&Question> {
        self.ensure_in_progress()?;
        if self.pending.is_some() {
            return Err(Error::Conflict(format!(
                "round {} already has a question awaiting an answer",
                self.round
            )));
        }
        if question.options.len() < 2 || question.correct_option >= question.options.len() {
            return Err(Error::Internal("question has no valid correct option".to_string()));
        }
        self.touch();
        let pending = self.pending.insert(PendingQuestion {
            question,
            issued_at: self.last_activity,
        });
        Ok(&pending.question)
    }

    /// Evaluates the answer to the pending question and advances the round.
    pub fn submit(&mut self, answer: AnswerEvent) -> Result<RoundFeedback> {
        self.ensure_in_progress()?;
        let question_len = match &self.pending {
            Some(pending) => pending.question.options.len(),
            None => {
                return Err(Error::Conflict(format!(
                    "round {} has no question awaiting an answer",
                    self.round
                )))
            }
        };
        if !answer.elapsed_secs.is_finite() || answer.elapsed_secs < 0.0 {
            return Err(Error::BadRequest(
                "elapsed time must be a non-negative number of seconds".to_string(),
            ));
        }
        if let Some(selected) = answer.selected_option {
            if selected >= question_len {
                return Err(Error::BadRequest(format!(
                    "selected option {} does not exist, question has {} options",
                    selected, question_len
                )));
            }
        }

        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => return Err(Error::Internal("pending question vanished".to_string())),
        };
        let question = pending.question;
        let outcome = self.evaluate(&question, &answer);

        if outcome.is_correct() {
            self.score += 1;
            if self.config.adaptive_progression {
                self.difficulty = self.difficulty.step_up();
            }
        }

        let round = self.round;
        let feedback = RoundFeedback {
            round,
            outcome,
            correct: outcome.is_correct(),
            selected_option: answer.selected_option,
            correct_option: question.correct_option,
            correct_answer: question.correct_answer().to_string(),
            explanation: question.explanation.clone(),
            concept: question.concept_label().to_string(),
            elapsed_secs: answer.elapsed_secs,
            score: self.score,
            difficulty: self.difficulty,
            completed: round >= self.config.question_count,
        };

        self.touch();
        self.history.push(RoundRecord {
            round,
            question,
            answer,
            outcome,
            answered_at: self.last_activity,
        });
        self.round += 1;

        tracing::info!(
            session_id = %self.id,
            round,
            outcome = ?outcome,
            score = self.score,
            difficulty = %self.difficulty,
            "Answer evaluated"
        );

        if self.round > self.config.question_count {
            self.complete();
        }

        Ok(feedback)
    }

    /// Ends the run before all rounds are played. An unanswered pending
    /// question is recorded as a timeout; if that was the last round the
    /// run counts as finished normally.
    pub fn finish_early(&mut self) -> Result<QuizSummary> {
        self.ensure_in_progress()?;
        if self.pending.is_some() {
            let elapsed = self.config.time_limit_secs as f64;
            self.submit(AnswerEvent::timed_out(elapsed))?;
        }
        if self.phase != SessionPhase::Completed {
            self.ended_early = true;
            self.complete();
        }
        self.summary()
    }

    pub fn summary(&self) -> Result<QuizSummary> {
        if self.phase != SessionPhase::Completed {
            return Err(Error::Conflict(
                "summary is only available once the quiz is completed".to_string(),
            ));
        }
        let max_score = self.config.question_count;
        let answered: Vec<f64> = self
            .history
            .iter()
            .filter(|r| r.outcome != AnswerOutcome::TimedOut)
            .map(|r| r.answer.elapsed_secs)
            .collect();
        let average_answer_secs = if answered.is_empty() {
            None
        } else {
            Some(answered.iter().sum::<f64>() / answered.len() as f64)
        };

        Ok(QuizSummary {
            session_id: self.id,
            score: self.score,
            max_score,
            accuracy_percent: (self.score as f64 / max_score as f64) * 100.0,
            initial_difficulty: self.config.initial_difficulty,
            final_difficulty: self.difficulty,
            concepts_covered: self.asked_concepts(),
            average_answer_secs,
            ended_early: self.ended_early,
            rounds: self.history.clone(),
        })
    }

    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_activity < cutoff
    }

    fn evaluate(&self, question: &Question, answer: &AnswerEvent) -> AnswerOutcome {
        let limit = self.config.time_limit_secs as f64;
        match answer.selected_option {
            None => AnswerOutcome::TimedOut,
            Some(_) if answer.elapsed_secs > limit => AnswerOutcome::TimedOut,
            Some(selected) if selected == question.correct_option => AnswerOutcome::Correct,
            Some(_) => AnswerOutcome::Incorrect,
        }
    }

    fn complete(&mut self) {
        self.phase = SessionPhase::Completed;
        tracing::info!(
            session_id = %self.id,
            score = self.score,
            max_score = self.config.question_count,
            difficulty = %self.difficulty,
            "Quiz completed"
        );
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(concept: &str) -> Question {
        Question {
            stem: format!("Question about {}", concept),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: 1,
            explanation: Some("b is right".to_string()),
            concept: Some(concept.to_string()),
            difficulty: DifficultyLevel::Beginner,
            style: None,
        }
    }

    fn started(config: QuizConfig) -> QuizSession {
        let mut session = QuizSession::new(config).unwrap();
        session.start().unwrap();
        session
    }

    fn play(session: &mut QuizSession, concept: &str, answer: AnswerEvent) -> RoundFeedback {
        session.begin_round(question(concept)).unwrap();
        session.submit(answer).unwrap()
    }

    #[test]
    fn start_moves_to_round_one_at_baseline() {
        let config = QuizConfig::new("Backend Engineer", 3, 3, 30)
            .with_initial_difficulty(DifficultyLevel::Intermediate);
        let mut session = QuizSession::new(config).unwrap();
        assert_eq!(session.phase(), SessionPhase::Configuring);
        assert!(session.begin_round(question("x")).is_err());

        session.start().unwrap();
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.round(), 1);
        assert_eq!(session.score(), 0);
        assert_eq!(session.difficulty(), DifficultyLevel::Intermediate);
        assert!(matches!(session.start(), Err(Error::Conflict(_))));
    }

    #[test]
    fn invalid_configuration_never_creates_a_session() {
        assert!(QuizSession::new(QuizConfig::new("Backend Engineer", 3, 0, 30)).is_err());
        assert!(QuizSession::new(QuizConfig::new("Backend Engineer", 3, 3, 0)).is_err());
    }

    #[test]
    fn backend_engineer_scenario() {
        let mut session = started(QuizConfig::new("Backend Engineer", 3, 3, 30));
        let baseline = session.difficulty();

        assert!(play(&mut session, "Indexes", AnswerEvent::selected(1, 10.0)).correct);
        assert!(play(&mut session, "Caching", AnswerEvent::selected(1, 12.0)).correct);
        let last = play(&mut session, "Queues", AnswerEvent::selected(0, 8.0));
        assert!(!last.correct);
        assert!(last.completed);

        assert_eq!(session.score(), 2);
        assert_eq!(session.difficulty(), baseline.step_up().step_up());
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.round(), 4);
        assert_eq!(session.phase(), SessionPhase::Completed);

        let summary = session.summary().unwrap();
        assert_eq!(summary.score, 2);
        assert_eq!(summary.max_score, 3);
        assert_eq!(summary.final_difficulty, DifficultyLevel::SeniorLevel);
        assert_eq!(summary.concepts_covered, vec!["Indexes", "Caching", "Queues"]);
        assert!(!summary.ended_early);
    }

    #[test]
    fn late_answer_is_scored_as_timeout_even_when_right() {
        let mut session = started(QuizConfig::new("Backend Engineer", 3, 2, 30));
        let feedback = play(&mut session, "Locks", AnswerEvent::selected(1, 30.5));
        assert_eq!(feedback.outcome, AnswerOutcome::TimedOut);
        assert_eq!(session.score(), 0);
        assert_eq!(session.difficulty(), DifficultyLevel::Beginner);

        let on_the_bell = play(&mut session, "Locks", AnswerEvent::selected(1, 30.0));
        assert!(on_the_bell.correct);
    }

    #[test]
    fn timeout_sentinel_counts_as_incorrect() {
        let mut session = started(QuizConfig::new("SRE", 5, 1, 20));
        let feedback = play(&mut session, "Paging", AnswerEvent::timed_out(20.0));
        assert_eq!(feedback.outcome, AnswerOutcome::TimedOut);
        assert!(!feedback.correct);
        assert_eq!(feedback.correct_answer, "b");
        assert_eq!(session.phase(), SessionPhase::Completed);
    }

    #[test]
    fn difficulty_never_decreases_and_score_matches_history() {
        let n = 10;
        let mut session = started(QuizConfig::new("ML Engineer", 2, n, 60));
        let mut last = session.difficulty();
        for i in 0..n {
            let pick = if i % 3 == 0 { 0 } else { 1 };
            play(&mut session, &format!("c{}", i), AnswerEvent::selected(pick, 5.0));
            assert!(session.difficulty() >= last);
            last = session.difficulty();
        }
        let correct = session.history().iter().filter(|r| r.is_correct()).count() as u32;
        assert_eq!(session.score(), correct);
        assert_eq!(session.history().len(), n as usize);
        assert_eq!(session.round(), n + 1);
        assert_eq!(session.difficulty(), DifficultyLevel::HiringChallenge);
    }

    #[test]
    fn adaptive_progression_off_keeps_baseline() {
        let mut session = started(
            QuizConfig::new("Data Scientist", 1, 2, 30).with_adaptive_progression(false),
        );
        play(&mut session, "Pandas", AnswerEvent::selected(1, 3.0));
        play(&mut session, "NumPy", AnswerEvent::selected(1, 3.0));
        assert_eq!(session.score(), 2);
        assert_eq!(session.difficulty(), DifficultyLevel::Beginner);
    }

    #[test]
    fn submit_rejects_bad_input_without_consuming_the_question() {
        let mut session = started(QuizConfig::new("Backend Engineer", 3, 2, 30));
        assert!(matches!(
            session.submit(AnswerEvent::selected(0, 1.0)),
            Err(Error::Conflict(_))
        ));

        session.begin_round(question("Sharding")).unwrap();
        assert!(matches!(
            session.begin_round(question("Other")),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            session.submit(AnswerEvent::selected(9, 1.0)),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            session.submit(AnswerEvent::selected(1, -1.0)),
            Err(Error::BadRequest(_))
        ));
        assert!(session.pending_question().is_some());
        assert!(session.submit(AnswerEvent::selected(1, 1.0)).unwrap().correct);
    }

    #[test]
    fn completed_is_terminal() {
        let mut session = started(QuizConfig::new("Backend Engineer", 3, 1, 30));
        play(&mut session, "Raft", AnswerEvent::selected(1, 2.0));
        assert!(matches!(
            session.begin_round(question("Paxos")),
            Err(Error::Conflict(_))
        ));
        assert!(session.finish_early().is_err());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn finish_early_records_pending_question_as_timeout() {
        let mut session = started(QuizConfig::new("Backend Engineer", 3, 5, 30));
        play(&mut session, "gRPC", AnswerEvent::selected(1, 4.0));
        session.begin_round(question("REST")).unwrap();
        assert!(session.summary().is_err());

        let summary = session.finish_early().unwrap();
        assert!(summary.ended_early);
        assert_eq!(summary.rounds.len(), 2);
        assert_eq!(summary.rounds[1].outcome, AnswerOutcome::TimedOut);
        assert_eq!(summary.score, 1);
        assert_eq!(summary.max_score, 5);
        assert_eq!(summary.average_answer_secs, Some(4.0));
        assert_eq!(session.phase(), SessionPhase::Completed);
    }

    #[test]
    fn finishing_on_the_last_pending_round_is_not_early() {
        let mut session = started(QuizConfig::new("Backend Engineer", 3, 2, 30));
        play(&mut session, "gRPC", AnswerEvent::selected(1, 4.0));
        session.begin_round(question("REST")).unwrap();

        let summary = session.finish_early().unwrap();
        assert!(!summary.ended_early);
        assert_eq!(summary.rounds.len(), 2);
        assert_eq!(summary.rounds[1].outcome, AnswerOutcome::TimedOut);
        assert_eq!(session.round(), 3);
        assert_eq!(session.phase(), SessionPhase::Completed);
    }
}
