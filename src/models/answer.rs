use crate::models::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user response. `selected_option: None` is the timeout sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub selected_option: Option<usize>,
    pub elapsed_secs: f64,
}

impl AnswerEvent {
    pub fn selected(option: usize, elapsed_secs: f64) -> Self {
        Self {
            selected_option: Some(option),
            elapsed_secs,
        }
    }

    pub fn timed_out(elapsed_secs: f64) -> Self {
        Self {
            selected_option: None,
            elapsed_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    TimedOut,
}

impl AnswerOutcome {
    pub fn is_correct(self) -> bool {
        matches!(self, AnswerOutcome::Correct)
    }
}

/// A finished round as kept in the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub question: Question,
    pub answer: AnswerEvent,
    pub outcome: AnswerOutcome,
    pub answered_at: DateTime<Utc>,
}

impl RoundRecord {
    pub fn is_correct(&self) -> bool {
        self.outcome.is_correct()
    }
}
