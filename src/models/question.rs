use crate::models::difficulty::DifficultyLevel;
use crate::models::quiz_config::QuestionStyle;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A generated multiple-choice question, correct answer included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub stem: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub explanation: Option<String>,
    pub concept: Option<String>,
    #[serde(default)]
    pub difficulty: DifficultyLevel,
    #[serde(default)]
    pub style: Option<QuestionStyle>,
}

impl Question {
    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_option]
    }

    pub fn concept_label(&self) -> &str {
        self.concept.as_deref().unwrap_or("General")
    }

    /// Stamps the difficulty and style the question was requested at.
    pub fn generated_at(mut self, difficulty: DifficultyLevel, style: QuestionStyle) -> Self {
        self.difficulty = difficulty;
        self.style = Some(style);
        self
    }

    /// Shuffles the options while keeping `correct_option` on the same text.
    pub fn shuffle_options(&mut self, rng: &mut impl rand::Rng) {
        let correct = self.options[self.correct_option].clone();
        self.options.shuffle(rng);
        self.correct_option = self
            .options
            .iter()
            .position(|option| option == &correct)
            .unwrap_or(0);
    }

    pub fn to_public(&self, round: u32) -> PublicQuestion {
        PublicQuestion {
            round,
            stem: self.stem.clone(),
            options: self
                .options
                .iter()
                .enumerate()
                .map(|(index, text)| PublicOption {
                    index,
                    label: option_label(index),
                    text: text.clone(),
                })
                .collect(),
            difficulty: self.difficulty,
            style: self.style,
        }
    }
}

/// Letter shown next to an option: 0 -> 'A', 1 -> 'B', ...
pub fn option_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// What the presentation layer sees before answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub round: u32,
    pub stem: String,
    pub options: Vec<PublicOption>,
    pub difficulty: DifficultyLevel,
    pub style: Option<QuestionStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicOption {
    pub index: usize,
    pub label: char,
    pub text: String,
}
