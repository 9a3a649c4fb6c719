use crate::error::{Error, Result};
use crate::models::difficulty::DifficultyLevel;
use crate::models::question::PublicQuestion;
use crate::models::quiz_config::{
    normalize_list, split_comma_list, InterviewStyle, QuestionStyle, QuizConfig, RoleLevel,
    ScenarioType,
};
use crate::models::quiz_session::{QuizSession, SessionPhase};
use crate::utils::time::seconds_per_question;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Either a JSON array of strings or a comma-separated string.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StringList {
    List(Vec<String>),
    Csv(String),
}

impl Default for StringList {
    fn default() -> Self {
        StringList::List(Vec::new())
    }
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringList::List(items) => normalize_list(items),
            StringList::Csv(raw) => split_comma_list(&raw),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub test_name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub role: String,
    #[serde(default)]
    pub role_level: RoleLevel,
    #[validate(range(max = 60))]
    #[serde(default)]
    pub years_experience: u32,
    #[serde(default)]
    pub tech_stack: StringList,
    #[serde(default)]
    pub interested_technologies: StringList,
    #[serde(default)]
    pub target_companies: StringList,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub current_industry: Option<String>,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub target_industry: Option<String>,
    #[serde(default)]
    pub learning_goals: StringList,
    #[serde(default)]
    pub scenario_type: ScenarioType,
    #[serde(default)]
    pub interview_style: InterviewStyle,
    #[serde(default)]
    pub question_formats: StringList,
    #[serde(default)]
    pub question_styles: Vec<QuestionStyle>,
    #[validate(range(min = 1, max = 50))]
    pub question_count: u32,
    #[validate(range(min = 1, max = 3600))]
    pub time_limit_per_question_secs: Option<u32>,
    #[validate(range(min = 1, max = 600))]
    pub total_time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub initial_difficulty: DifficultyLevel,
    #[serde(default = "default_true")]
    pub adaptive_progression: bool,
    #[serde(default)]
    pub shuffle_options: bool,
}

fn default_true() -> bool {
    true
}

impl CreateQuizRequest {
    /// Validates the form and turns it into the run configuration.
    pub fn into_config(self) -> Result<QuizConfig> {
        self.validate()?;

        let time_limit_secs = match (self.time_limit_per_question_secs, self.total_time_limit_minutes) {
            (Some(per_question), _) => per_question,
            (None, Some(total_minutes)) => seconds_per_question(total_minutes, self.question_count),
            (None, None) => {
                return Err(Error::BadRequest(
                    "either time_limit_per_question_secs or total_time_limit_minutes is required"
                        .to_string(),
                ))
            }
        };

        let question_formats = match self.question_formats.into_vec() {
            formats if formats.is_empty() => vec!["MCQ".to_string()],
            formats => formats,
        };
        let mut question_styles: Vec<QuestionStyle> = Vec::with_capacity(self.question_styles.len());
        for style in self.question_styles {
            if !question_styles.contains(&style) {
                question_styles.push(style);
            }
        }
        if question_styles.is_empty() {
            question_styles = QuestionStyle::defaults();
        }

        let config = QuizConfig {
            test_name: self.test_name,
            role: self.role.trim().to_string(),
            role_level: self.role_level,
            years_experience: self.years_experience,
            tech_stack: self.tech_stack.into_vec(),
            interested_technologies: self.interested_technologies.into_vec(),
            target_companies: self.target_companies.into_vec(),
            current_industry: self.current_industry,
            target_industry: self.target_industry,
            learning_goals: self.learning_goals.into_vec(),
            scenario_type: self.scenario_type,
            interview_style: self.interview_style,
            question_formats,
            question_styles,
            question_count: self.question_count,
            time_limit_secs,
            initial_difficulty: self.initial_difficulty,
            adaptive_progression: self.adaptive_progression,
            shuffle_options: self.shuffle_options,
        };
        config.validate()?;
        Ok(config)
    }
}

fn trim_optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub round: u32,
    pub total_questions: u32,
    pub score: u32,
    pub difficulty: DifficultyLevel,
    pub time_limit_secs: u32,
    pub awaiting_answer: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&QuizSession> for SessionStatusResponse {
    fn from(session: &QuizSession) -> Self {
        Self {
            session_id: session.id(),
            phase: session.phase(),
            round: session.round(),
            total_questions: session.config().question_count,
            score: session.score(),
            difficulty: session.difficulty(),
            time_limit_secs: session.config().time_limit_secs,
            awaiting_answer: session.pending_question().is_some(),
            created_at: session.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub session_id: Uuid,
    pub total_questions: u32,
    pub time_limit_secs: u32,
    pub time_limit_display: String,
    pub score: u32,
    pub question: PublicQuestion,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    /// Zero-based option index; omit or null when the timer ran out.
    pub selected_option: Option<usize>,
    #[validate(range(min = 0.0))]
    pub elapsed_seconds: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> CreateQuizRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn form_fields_become_config() {
        let config = request(json!({
            "test_name": "  Mock round  ",
            "role": " Backend Engineer ",
            "years_experience": 3,
            "tech_stack": "Rust, PostgreSQL, , rust",
            "target_companies": ["Razorpay", "Startups"],
            "scenario_type": "system_design",
            "question_styles": ["debugging_based"],
            "question_count": 3,
            "time_limit_per_question_secs": 30
        }))
        .into_config()
        .unwrap();

        assert_eq!(config.test_name.as_deref(), Some("Mock round"));
        assert_eq!(config.role, "Backend Engineer");
        assert_eq!(config.tech_stack, vec!["Rust", "PostgreSQL"]);
        assert_eq!(config.target_companies, vec!["Razorpay", "Startups"]);
        assert_eq!(config.scenario_type, ScenarioType::SystemDesign);
        assert_eq!(config.question_styles, vec![QuestionStyle::DebuggingBased]);
        assert_eq!(config.question_formats, vec!["MCQ"]);
        assert_eq!(config.time_limit_secs, 30);
        assert!(config.adaptive_progression);
        assert!(!config.shuffle_options);
    }

    #[test]
    fn total_time_budget_is_split_across_questions() {
        let config = request(json!({
            "role": "SDE II",
            "question_count": 10,
            "total_time_limit_minutes": 30
        }))
        .into_config()
        .unwrap();
        assert_eq!(config.time_limit_secs, 180);
        assert_eq!(config.question_styles, QuestionStyle::defaults());
    }

    #[test]
    fn invalid_forms_are_rejected() {
        let no_limit = request(json!({ "role": "SDE II", "question_count": 3 }));
        assert!(matches!(no_limit.into_config(), Err(Error::BadRequest(_))));

        let zero_questions = request(json!({
            "role": "SDE II",
            "question_count": 0,
            "time_limit_per_question_secs": 30
        }));
        assert!(matches!(zero_questions.into_config(), Err(Error::Validation(_))));

        let zero_time = request(json!({
            "role": "SDE II",
            "question_count": 3,
            "time_limit_per_question_secs": 0
        }));
        assert!(matches!(zero_time.into_config(), Err(Error::Validation(_))));

        let blank_role = request(json!({
            "role": "   ",
            "question_count": 3,
            "time_limit_per_question_secs": 30
        }));
        assert!(matches!(blank_role.into_config(), Err(Error::BadRequest(_))));
    }

    #[test]
    fn repeated_question_styles_are_kept_once() {
        let config = request(json!({
            "role": "SDE II",
            "question_count": 3,
            "time_limit_per_question_secs": 30,
            "question_styles": ["debugging_based", "briefly_explained", "debugging_based"]
        }))
        .into_config()
        .unwrap();
        assert_eq!(
            config.question_styles,
            vec![QuestionStyle::DebuggingBased, QuestionStyle::BrieflyExplained]
        );
    }
}
