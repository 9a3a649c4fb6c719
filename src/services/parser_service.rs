//! Turns raw model output into a [`Question`].
//!
//! The primary input is the labeled layout requested by the prompt:
//!
//! ```text
//! QUESTION: Which isolation level prevents phantom reads?
//! A) Read committed
//! B) Repeatable read
//! C) Serializable
//! D) Read uncommitted
//! ANSWER: C
//! EXPLANATION: Only serializable rules out phantoms.
//! CONCEPT: Isolation levels
//! ```
//!
//! Label case, surrounding whitespace, markdown bold and code fences are
//! tolerated, and a single JSON object with `question`, `choices`,
//! `correct_answer` is accepted as well. Anything that would require
//! guessing the correct option is rejected.

use crate::error::ParseError;
use crate::models::difficulty::DifficultyLevel;
use crate::models::question::{option_label, Question};
use serde::Deserialize;
use serde_json::Value as JsonValue;

pub fn parse(raw: &str) -> Result<Question, ParseError> {
    let text = strip_code_fences(raw);
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    if text.starts_with('{') {
        return parse_json(text);
    }

    match parse_layout(text) {
        Err(ParseError::LayoutMissing) if text.contains('{') && text.contains('}') => {
            parse_json(text)
        }
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Question,
    Answer,
    Explanation,
    Concept,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "question" | "q" => Some(Field::Question),
            "answer" | "correct answer" | "correct option" | "correct" => Some(Field::Answer),
            "explanation" => Some(Field::Explanation),
            "concept" | "topic" => Some(Field::Concept),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Question => "question",
            Field::Answer => "answer",
            Field::Explanation => "explanation",
            Field::Concept => "concept",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Field(Field),
    Option(usize),
}

#[derive(Default)]
struct Layout {
    stem: Option<String>,
    options: Vec<String>,
    answer: Option<String>,
    explanation: Option<String>,
    concept: Option<String>,
}

impl Layout {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Question => &mut self.stem,
            Field::Answer => &mut self.answer,
            Field::Explanation => &mut self.explanation,
            Field::Concept => &mut self.concept,
        }
    }
}

fn parse_layout(text: &str) -> Result<Question, ParseError> {
    let mut layout = Layout::default();
    let mut section: Option<Section> = None;

    for line in text.lines() {
        let cleaned = clean_line(line);
        if cleaned.is_empty() {
            continue;
        }

        if let Some((field, value)) = labeled_field(cleaned) {
            let slot = layout.slot(field);
            if slot.is_some() {
                return Err(ParseError::DuplicateField(field.name()));
            }
            *slot = Some(value.to_string());
            section = Some(Section::Field(field));
            continue;
        }

        // Nothing before the question label belongs to the layout.
        if layout.stem.is_none() {
            continue;
        }

        // Options follow the stem; later fields may hold lettered lines too.
        let in_options = matches!(section, Some(Section::Option(_)));
        let accepts_options = in_options || section == Some(Section::Field(Field::Question));
        if accepts_options {
            if let Some((letter, value)) = option_line(cleaned) {
                let expected = option_label(layout.options.len());
                if layout.options.len() < 26 && letter == expected {
                    layout.options.push(value.to_string());
                    section = Some(Section::Option(layout.options.len() - 1));
                    continue;
                }
                if in_options {
                    return Err(ParseError::OptionOutOfSequence {
                        expected,
                        found: letter,
                    });
                }
            }
        }

        match section {
            Some(Section::Field(Field::Answer)) | None => {}
            Some(Section::Field(field)) => {
                if let Some(existing) = layout.slot(field).as_mut() {
                    append_line(existing, cleaned, '\n');
                }
            }
            Some(Section::Option(idx)) => append_line(&mut layout.options[idx], cleaned, ' '),
        }
    }

    let stem = match layout.stem {
        Some(stem) => stem,
        None => return Err(ParseError::LayoutMissing),
    };
    let answer = layout.answer.ok_or(ParseError::MissingField("answer"))?;

    build_question(
        stem,
        layout.options,
        &Marker::Label(answer),
        layout.explanation,
        layout.concept,
    )
}

#[derive(Deserialize)]
struct JsonQuestion {
    #[serde(alias = "stem")]
    question: Option<String>,
    #[serde(alias = "options")]
    choices: Option<Vec<String>>,
    #[serde(alias = "answer")]
    correct_answer: Option<JsonValue>,
    explanation: Option<String>,
    concept: Option<String>,
}

fn parse_json(text: &str) -> Result<Question, ParseError> {
    let start = text.find('{').ok_or(ParseError::LayoutMissing)?;
    let end = text.rfind('}').ok_or(ParseError::LayoutMissing)?;
    if end < start {
        return Err(ParseError::LayoutMissing);
    }

    let raw: JsonQuestion = serde_json::from_str(&text[start..=end])
        .map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let stem = raw.question.ok_or(ParseError::MissingField("question"))?;
    let options = raw.choices.ok_or(ParseError::MissingField("options"))?;
    let marker = match raw.correct_answer {
        Some(JsonValue::String(s)) => Marker::Text(s),
        Some(JsonValue::Number(n)) => match n.as_u64() {
            Some(index) => Marker::Index(index),
            None => return Err(ParseError::UnknownAnswer(n.to_string())),
        },
        Some(other) => return Err(ParseError::AmbiguousAnswer(other.to_string())),
        None => return Err(ParseError::MissingField("answer")),
    };

    build_question(stem, options, &marker, raw.explanation, raw.concept)
}

enum Marker {
    /// From the layout: usually a letter, sometimes the option text.
    Label(String),
    /// From JSON: usually the option text, sometimes a letter.
    Text(String),
    Index(u64),
}

fn build_question(
    stem: String,
    options: Vec<String>,
    marker: &Marker,
    explanation: Option<String>,
    concept: Option<String>,
) -> Result<Question, ParseError> {
    let stem = stem.trim().to_string();
    if stem.is_empty() {
        return Err(ParseError::MissingField("question"));
    }

    let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() < 2 {
        return Err(ParseError::TooFewOptions(options.len()));
    }
    for (idx, option) in options.iter().enumerate() {
        if option.is_empty() {
            return Err(ParseError::MissingField("option text"));
        }
        if options[..idx].iter().any(|o| o.eq_ignore_ascii_case(option)) {
            return Err(ParseError::DuplicateOption(option.clone()));
        }
    }

    let correct_option = match marker {
        Marker::Label(label) => resolve_marker(label, &options, false)?,
        Marker::Text(text) => resolve_marker(text, &options, true)?,
        Marker::Index(index) => {
            let index = *index as usize;
            if index >= options.len() {
                return Err(ParseError::UnknownAnswer(index.to_string()));
            }
            index
        }
    };

    Ok(Question {
        stem,
        options,
        correct_option,
        explanation: non_empty(explanation),
        concept: non_empty(concept),
        difficulty: DifficultyLevel::default(),
        style: None,
    })
}

/// Maps an answer marker to an option index without guessing.
///
/// A marker that reads as one option's letter and another option's text is
/// ambiguous, unless `text_first` says the source names options by text.
fn resolve_marker(raw: &str, options: &[String], text_first: bool) -> Result<usize, ParseError> {
    let marker = raw
        .trim()
        .trim_matches(|c: char| c == '*' || c == '`' || c == '"' || c == '\'')
        .trim();
    if marker.is_empty() {
        return Err(ParseError::MissingField("answer"));
    }

    // Option texts are unique ignoring case, so at most one matches.
    let by_text = options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(marker));
    if text_first {
        if let Some(index) = by_text {
            return Ok(index);
        }
    }

    let unprefixed = strip_prefix_ignore_case(marker, "option ").unwrap_or(marker);
    let by_letter = match letter_marker(unprefixed) {
        Some((letter, rest)) => {
            let index = (letter as u8 - b'A') as usize;
            match options.get(index) {
                Some(option) if !rest.is_empty() && !rest.eq_ignore_ascii_case(option) => {
                    return Err(ParseError::AmbiguousAnswer(raw.trim().to_string()))
                }
                Some(_) => Some(index),
                None => None,
            }
        }
        None => None,
    };

    match (by_letter, by_text) {
        (Some(letter), Some(text)) if letter != text => {
            Err(ParseError::AmbiguousAnswer(raw.trim().to_string()))
        }
        (Some(index), _) | (None, Some(index)) => Ok(index),
        (None, None) => {
            let mentioned = unprefixed
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|token| token.len() == 1)
                .filter_map(|token| token.chars().next())
                .filter(|c| c.is_ascii_uppercase() && ((*c as u8 - b'A') as usize) < options.len())
                .count();
            if mentioned > 1 {
                Err(ParseError::AmbiguousAnswer(raw.trim().to_string()))
            } else {
                Err(ParseError::UnknownAnswer(raw.trim().to_string()))
            }
        }
    }
}

/// `B`, `b`, `(B)`, `B)`, `B.`, `B: text`.
fn letter_marker(marker: &str) -> Option<(char, &str)> {
    let (body, parenthesised) = match marker.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (marker, false),
    };
    let mut chars = body.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let rest = chars.as_str();
    if rest.is_empty() && !parenthesised {
        return Some((first.to_ascii_uppercase(), ""));
    }
    let mut rest_chars = rest.chars();
    match rest_chars.next() {
        Some(')') => Some((first.to_ascii_uppercase(), rest_chars.as_str().trim())),
        Some('.') | Some(':') if !parenthesised => {
            Some((first.to_ascii_uppercase(), rest_chars.as_str().trim()))
        }
        _ => None,
    }
}

fn labeled_field(line: &str) -> Option<(Field, &str)> {
    let (label, value) = line.split_once(':')?;
    let label = label.trim().trim_matches('*').trim().to_ascii_lowercase();
    let field = Field::from_label(&label)?;
    Some((field, value.trim().trim_matches('*').trim()))
}

/// `A) text`, `A. text`, `A: text`, `(A) text`.
fn option_line(line: &str) -> Option<(char, &str)> {
    let head = line.split_whitespace().next()?;
    // A bare letter is more likely code (`x = 5`) than an option.
    if head.len() < 2 {
        return None;
    }
    let (letter, rest) = letter_marker(head)?;
    if !rest.is_empty() {
        return None;
    }
    let value = line[head.len()..].trim();
    if value.is_empty() {
        return None;
    }
    Some((letter, value))
}

fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c == '#' || c == '>')
        .trim()
}

fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(value[prefix.len()..].trim())
    } else {
        None
    }
}

fn append_line(target: &mut String, line: &str, separator: char) {
    if !target.is_empty() {
        target.push(separator);
    }
    target.push_str(line);
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
