use crate::error::{Error, Result};
use crate::models::difficulty::DifficultyLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_QUESTIONS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    #[default]
    OnlineTest,
    SystemDesign,
    CodePairing,
    TakeHome,
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScenarioType::OnlineTest => "Online Test",
            ScenarioType::SystemDesign => "System Design",
            ScenarioType::CodePairing => "Code Pairing",
            ScenarioType::TakeHome => "Take-Home",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoleLevel {
    Intern,
    #[default]
    Entry,
    MidLevel,
    Senior,
    Lead,
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoleLevel::Intern => "Intern",
            RoleLevel::Entry => "Entry",
            RoleLevel::MidLevel => "Mid-Level",
            RoleLevel::Senior => "Senior",
            RoleLevel::Lead => "Lead",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStyle {
    #[default]
    Simulated,
    Educational,
    SpeedTest,
}

impl fmt::Display for InterviewStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InterviewStyle::Simulated => "Simulated",
            InterviewStyle::Educational => "Educational",
            InterviewStyle::SpeedTest => "Speed Test",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStyle {
    DescriptiveAndExplained,
    BrieflyExplained,
    InnovativeScenarioBased,
    DebuggingBased,
}

impl QuestionStyle {
    pub fn defaults() -> Vec<QuestionStyle> {
        vec![
            QuestionStyle::DescriptiveAndExplained,
            QuestionStyle::InnovativeScenarioBased,
        ]
    }
}

impl fmt::Display for QuestionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuestionStyle::DescriptiveAndExplained => "Descriptive and explained",
            QuestionStyle::BrieflyExplained => "Briefly explained",
            QuestionStyle::InnovativeScenarioBased => "Innovative Scenario based",
            QuestionStyle::DebuggingBased => "Debugging based",
        })
    }
}

/// Immutable parameters of one quiz run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub test_name: Option<String>,
    pub role: String,
    pub role_level: RoleLevel,
    pub years_experience: u32,
    pub tech_stack: Vec<String>,
    pub interested_technologies: Vec<String>,
    pub target_companies: Vec<String>,
    pub current_industry: Option<String>,
    pub target_industry: Option<String>,
    pub learning_goals: Vec<String>,
    pub scenario_type: ScenarioType,
    pub interview_style: InterviewStyle,
    pub question_formats: Vec<String>,
    pub question_styles: Vec<QuestionStyle>,
    pub question_count: u32,
    pub time_limit_secs: u32,
    pub initial_difficulty: DifficultyLevel,
    pub adaptive_progression: bool,
    pub shuffle_options: bool,
}

impl QuizConfig {
    /// Minimal configuration; everything else takes the form defaults.
    pub fn new(role: impl Into<String>, years_experience: u32, question_count: u32, time_limit_secs: u32) -> Self {
        Self {
            test_name: None,
            role: role.into(),
            role_level: RoleLevel::default(),
            years_experience,
            tech_stack: Vec::new(),
            interested_technologies: Vec::new(),
            target_companies: Vec::new(),
            current_industry: None,
            target_industry: None,
            learning_goals: Vec::new(),
            scenario_type: ScenarioType::default(),
            interview_style: InterviewStyle::default(),
            question_formats: vec!["MCQ".to_string()],
            question_styles: QuestionStyle::defaults(),
            question_count,
            time_limit_secs,
            initial_difficulty: DifficultyLevel::default(),
            adaptive_progression: true,
            shuffle_options: false,
        }
    }

    pub fn with_tech_stack<I, S>(mut self, stack: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tech_stack = normalize_list(stack.into_iter().map(Into::into));
        self
    }

    pub fn with_scenario(mut self, scenario: ScenarioType) -> Self {
        self.scenario_type = scenario;
        self
    }

    pub fn with_initial_difficulty(mut self, difficulty: DifficultyLevel) -> Self {
        self.initial_difficulty = difficulty;
        self
    }

    pub fn with_adaptive_progression(mut self, enabled: bool) -> Self {
        self.adaptive_progression = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.role.trim().is_empty() {
            return Err(Error::BadRequest("role must not be empty".to_string()));
        }
        if self.question_count == 0 || self.question_count > MAX_QUESTIONS {
            return Err(Error::BadRequest(format!(
                "question_count must be between 1 and {}",
                MAX_QUESTIONS
            )));
        }
        if self.time_limit_secs == 0 {
            return Err(Error::BadRequest(
                "time limit per question must be greater than zero".to_string(),
            ));
        }
        if self.question_styles.is_empty() {
            return Err(Error::BadRequest(
                "at least one question style is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trims entries, drops blanks and case-insensitive duplicates, keeps order.
pub fn normalize_list<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if out.iter().any(|seen| seen.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

/// Splits a comma-separated form field ("React, Django, SQL").
pub fn split_comma_list(raw: &str) -> Vec<String> {
    normalize_list(raw.split(',').map(str::to_string))
}
