use crate::models::difficulty::DifficultyLevel;
use crate::models::quiz_config::{QuestionStyle, QuizConfig};

/// How many of the most recent concepts are listed as already asked.
pub const RECENT_CONCEPTS: usize = 5;

pub const SYSTEM_PROMPT: &str = "You are an expert technical interviewer who writes precise multiple-choice questions. \
Always answer in the exact plain-text layout you are given, with no extra commentary.";

const RESPONSE_LAYOUT: &str = r#"QUESTION: <the question text>
A) <option>
B) <option>
C) <option>
D) <option>
ANSWER: <the single letter of the correct option>
EXPLANATION: <brief explanation of why the answer is correct>
CONCEPT: <the main concept being tested, 1-2 words>"#;

/// Builds the user prompt for one round. Pure and deterministic.
pub fn build_prompt(
    config: &QuizConfig,
    difficulty: DifficultyLevel,
    asked_concepts: &[String],
    style: QuestionStyle,
) -> String {
    let recent: Vec<&str> = asked_concepts
        .iter()
        .rev()
        .take(RECENT_CONCEPTS)
        .rev()
        .map(String::as_str)
        .collect();

    let mut prompt = String::new();
    prompt.push_str("Create one multiple-choice question using these parameters.\n\n");

    prompt.push_str("Testing Structure:\n");
    if let Some(name) = config.test_name.as_deref().filter(|n| !n.trim().is_empty()) {
        push_field(&mut prompt, "Test Name", name);
    }
    push_field(&mut prompt, "Question Formats", &join_or_none(&config.question_formats));
    push_field(&mut prompt, "Question Style", &style.to_string());
    push_field(&mut prompt, "Current Difficulty", difficulty.label());

    prompt.push_str("\nCareer Profile:\n");
    push_field(&mut prompt, "Target Role", &config.role);
    push_field(&mut prompt, "Role Level", &config.role_level.to_string());
    push_field(
        &mut prompt,
        "Years of Experience",
        &config.years_experience.to_string(),
    );
    push_field(&mut prompt, "Tech Stack", &join_or_none(&config.tech_stack));
    if !config.interested_technologies.is_empty() {
        push_field(
            &mut prompt,
            "Interested Technologies",
            &config.interested_technologies.join(", "),
        );
    }
    if let Some(industry) = &config.current_industry {
        push_field(&mut prompt, "Current Industry", industry);
    }
    if let Some(industry) = &config.target_industry {
        push_field(&mut prompt, "Target Industry", industry);
    }
    if !config.learning_goals.is_empty() {
        push_field(&mut prompt, "Learning Goals", &config.learning_goals.join(", "));
    }

    prompt.push_str("\nReal World Alignment:\n");
    push_field(&mut prompt, "Scenario", &config.scenario_type.to_string());
    push_field(&mut prompt, "Interview Style", &config.interview_style.to_string());
    push_field(&mut prompt, "Target Companies", &join_or_none(&config.target_companies));

    prompt.push_str("\nAlready Asked Concepts: ");
    if recent.is_empty() {
        prompt.push_str("None");
    } else {
        prompt.push_str(&recent.join(", "));
    }

    prompt.push_str(
        "\n\nRules:\n\
         1. The question must test a concept different from the already asked concepts.\n\
         2. Match the current difficulty level and the question style.\n\
         3. Give exactly four distinct options and exactly one correct answer.\n\
         4. Do not use \"All of the above\" or \"None of the above\".\n\n\
         Respond using exactly this layout, each field on its own line:\n",
    );
    prompt.push_str(RESPONSE_LAYOUT);
    prompt
}

fn push_field(prompt: &mut String, name: &str, value: &str) {
    prompt.push_str("- ");
    prompt.push_str(name);
    prompt.push_str(": ");
    prompt.push_str(value);
    prompt.push('\n');
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}
