use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::types::QuestionKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuestionCreate {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    #[serde(alias = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    #[validate(length(min = 1, message = "correct_answer must not be empty"))]
    pub correct_answer: String,
    #[validate(range(min = 1, message = "marks must be positive"))]
    pub marks: i64,
}

impl QuestionCreate {
    pub fn mcq(text: &str, options: &[&str], correct_answer: &str, marks: i64) -> Self {
        Self {
            text: text.to_string(),
            kind: QuestionKind::Mcq,
            options: options.iter().map(|option| option.to_string()).collect(),
            correct_answer: correct_answer.to_string(),
            marks,
        }
    }

    pub fn yes_no(text: &str, correct_answer: &str, marks: i64) -> Self {
        Self {
            text: text.to_string(),
            kind: QuestionKind::YesNo,
            options: Vec::new(),
            correct_answer: correct_answer.to_string(),
            marks,
        }
    }

    pub fn fill_in_blanks(text: &str, correct_answer: &str, marks: i64) -> Self {
        Self {
            text: text.to_string(),
            kind: QuestionKind::FillInBlanks,
            options: Vec::new(),
            correct_answer: correct_answer.to_string(),
            marks,
        }
    }
}
