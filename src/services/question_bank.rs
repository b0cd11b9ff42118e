use std::collections::HashSet;

use uuid::Uuid;
use validator::Validate;

use crate::errors::TestFlowError;
use crate::models::types::QuestionKind;
use crate::models::{Question, NO, YES};
use crate::schemas::QuestionCreate;

const MIN_MCQ_OPTIONS: usize = 2;

pub fn create_question(payload: QuestionCreate) -> Result<Question, TestFlowError> {
    build_question(Uuid::new_v4().to_string(), payload)
}

/// Builds a question under an existing id, used when a draft question is edited.
pub(crate) fn build_question(id: String, payload: QuestionCreate) -> Result<Question, TestFlowError> {
    payload.validate()?;

    let marks = u32::try_from(payload.marks)
        .map_err(|_| TestFlowError::Validation("marks is out of range".to_string()))?;

    let options = match payload.kind {
        QuestionKind::Mcq => {
            validate_mcq_options(&payload.options, &payload.correct_answer)?;
            payload.options
        }
        QuestionKind::YesNo => {
            if payload.correct_answer != YES && payload.correct_answer != NO {
                return Err(TestFlowError::Validation(format!(
                    "correct_answer must be '{YES}' or '{NO}' for a yes/no question"
                )));
            }
            Vec::new()
        }
        QuestionKind::FillInBlanks => Vec::new(),
    };

    Ok(Question {
        id,
        text: payload.text,
        kind: payload.kind,
        options,
        correct_answer: payload.correct_answer,
        marks,
    })
}

fn validate_mcq_options(options: &[String], correct_answer: &str) -> Result<(), TestFlowError> {
    if options.len() < MIN_MCQ_OPTIONS {
        return Err(TestFlowError::Validation(format!(
            "a multiple choice question needs at least {MIN_MCQ_OPTIONS} options"
        )));
    }
    if options.iter().any(|option| option.trim().is_empty()) {
        return Err(TestFlowError::Validation("options must not be empty".to_string()));
    }

    let mut seen = HashSet::with_capacity(options.len());
    if !options.iter().all(|option| seen.insert(option.as_str())) {
        return Err(TestFlowError::Validation("options must be distinct".to_string()));
    }

    if !options.iter().any(|option| option == correct_answer) {
        return Err(TestFlowError::Validation(
            "correct_answer must be one of the options".to_string(),
        ));
    }

    Ok(())
}

/// Exact, case-sensitive comparison; no trimming and no partial credit.
pub fn check_answer(question: &Question, given_answer: &str) -> bool {
    given_answer == question.correct_answer
}
