use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::time::format_countdown;
use crate::errors::TestFlowError;
use crate::models::types::TestMode;
use crate::models::{OnlineTestSubmission, Question, Test};
use crate::schemas::attempt::{
    InstructionsView, PaletteEntry, QuestionView, ReviewEntry, ReviewSummary, TakingView,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStage {
    Instructions,
    Taking { index: usize },
    /// Confirmation screen; the countdown keeps running.
    Review,
    Result { submission: OnlineTestSubmission },
}

impl AttemptStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Instructions => "instructions",
            Self::Taking { .. } => "taking",
            Self::Review => "review",
            Self::Result { .. } => "result",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running(u64),
    /// Reported once, on the tick that reaches zero.
    Expired,
    Idle,
}

/// One student's pass through an online test. Holds no timer; callers drive `tick`.
#[derive(Debug, Clone)]
pub struct Attempt {
    test: Arc<Test>,
    student_id: String,
    stage: AttemptStage,
    answers: BTreeMap<String, String>,
    remaining_seconds: u64,
    expired: bool,
}

impl Attempt {
    pub fn new(test: Arc<Test>, student_id: &str) -> Result<Self, TestFlowError> {
        if test.mode != TestMode::Online {
            return Err(TestFlowError::Validation("only online tests can be attempted".to_string()));
        }
        if test.questions.is_empty() {
            return Err(TestFlowError::Validation("test has no questions".to_string()));
        }

        Ok(Self {
            test,
            student_id: student_id.to_string(),
            stage: AttemptStage::Instructions,
            answers: BTreeMap::new(),
            remaining_seconds: 0,
            expired: false,
        })
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn stage(&self) -> &AttemptStage {
        &self.stage
    }

    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn submission(&self) -> Option<&OnlineTestSubmission> {
        match &self.stage {
            AttemptStage::Result { submission } => Some(submission),
            _ => None,
        }
    }

    pub fn start(&mut self) -> Result<(), TestFlowError> {
        if self.stage != AttemptStage::Instructions {
            return Err(TestFlowError::InvalidStage("attempt has already started"));
        }
        self.remaining_seconds = u64::from(self.test.duration_minutes) * 60;
        self.expired = false;
        self.stage = AttemptStage::Taking { index: 0 };
        Ok(())
    }

    pub fn go_to(&mut self, index: usize) -> Result<(), TestFlowError> {
        self.current_index()?;
        self.check_index(index)?;
        self.stage = AttemptStage::Taking { index };
        Ok(())
    }

    /// Stays on the last question.
    pub fn next(&mut self) -> Result<(), TestFlowError> {
        let index = self.current_index()?;
        let last = self.test.questions.len() - 1;
        self.stage = AttemptStage::Taking { index: (index + 1).min(last) };
        Ok(())
    }

    /// Stays on the first question.
    pub fn previous(&mut self) -> Result<(), TestFlowError> {
        let index = self.current_index()?;
        self.stage = AttemptStage::Taking { index: index.saturating_sub(1) };
        Ok(())
    }

    /// Sets or overwrites the answer to the current question.
    pub fn answer(&mut self, answer: &str) -> Result<(), TestFlowError> {
        let index = self.current_index()?;
        let question_id = self.test.questions[index].id.clone();
        self.answers.insert(question_id, answer.to_string());
        Ok(())
    }

    pub fn request_review(&mut self) -> Result<(), TestFlowError> {
        let index = self.current_index()?;
        if index + 1 != self.test.questions.len() {
            return Err(TestFlowError::InvalidStage(
                "review can only be requested from the last question",
            ));
        }
        self.stage = AttemptStage::Review;
        Ok(())
    }

    /// Leaves review for the question at `index`.
    pub fn edit_answer(&mut self, index: usize) -> Result<(), TestFlowError> {
        if self.stage != AttemptStage::Review {
            return Err(TestFlowError::InvalidStage("answers can only be edited from review"));
        }
        if self.expired {
            return Err(TestFlowError::InvalidStage("time is up"));
        }
        self.check_index(index)?;
        self.stage = AttemptStage::Taking { index };
        Ok(())
    }

    /// Advances the countdown by one second while taking or reviewing.
    pub fn tick(&mut self) -> TickOutcome {
        if self.expired || !matches!(self.stage, AttemptStage::Taking { .. } | AttemptStage::Review) {
            return TickOutcome::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.expired = true;
            return TickOutcome::Expired;
        }
        TickOutcome::Running(self.remaining_seconds)
    }

    /// Whether a submission may be finalized now: from review, or at expiry.
    pub fn can_finalize(&self) -> bool {
        match self.stage {
            AttemptStage::Review => true,
            AttemptStage::Taking { .. } => self.expired,
            AttemptStage::Instructions | AttemptStage::Result { .. } => false,
        }
    }

    pub fn complete(&mut self, submission: OnlineTestSubmission) {
        self.stage = AttemptStage::Result { submission };
    }

    /// Parks a failed finalization in review with every answer intact.
    pub fn recover_to_review(&mut self) {
        if !matches!(self.stage, AttemptStage::Result { .. }) {
            self.stage = AttemptStage::Review;
        }
    }

    /// Back to instructions with no answers. A finished attempt is left as is.
    pub fn reset(&mut self) -> bool {
        if matches!(self.stage, AttemptStage::Result { .. }) {
            return false;
        }
        self.stage = AttemptStage::Instructions;
        self.answers.clear();
        self.remaining_seconds = 0;
        self.expired = false;
        true
    }

    pub fn instructions(&self) -> InstructionsView {
        InstructionsView {
            title: self.test.title.clone(),
            duration_minutes: self.test.duration_minutes,
            total_questions: self.test.questions.len(),
            total_marks: self.test.total_marks,
        }
    }

    pub fn taking_view(&self) -> Result<TakingView, TestFlowError> {
        let index = self.current_index()?;
        let total = self.test.questions.len();
        let question = &self.test.questions[index];

        Ok(TakingView {
            question: question_view(index, question),
            current_answer: self.answers.get(&question.id).cloned(),
            position_label: format!("Question {} of {}", index + 1, total),
            progress_percent: (index + 1) as f64 / total as f64 * 100.0,
            is_last: index + 1 == total,
            palette: self
                .test
                .questions
                .iter()
                .enumerate()
                .map(|(position, item)| PaletteEntry {
                    index: position,
                    answered: self.answers.contains_key(&item.id),
                    current: position == index,
                })
                .collect(),
            remaining_seconds: self.remaining_seconds,
            remaining_label: format_countdown(self.remaining_seconds),
        })
    }

    pub fn review_summary(&self) -> Result<ReviewSummary, TestFlowError> {
        if self.stage != AttemptStage::Review {
            return Err(TestFlowError::InvalidStage("attempt is not in review"));
        }

        let entries: Vec<ReviewEntry> = self
            .test
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let answer = self.answers.get(&question.id).cloned();
                ReviewEntry {
                    index,
                    question_id: question.id.clone(),
                    text: question.text.clone(),
                    answered: answer.is_some(),
                    answer,
                }
            })
            .collect();
        let answered_count = entries.iter().filter(|entry| entry.answered).count();

        Ok(ReviewSummary {
            unanswered_count: entries.len() - answered_count,
            answered_count,
            entries,
            remaining_seconds: self.remaining_seconds,
        })
    }

    fn current_index(&self) -> Result<usize, TestFlowError> {
        match self.stage {
            AttemptStage::Taking { .. } if self.expired => Err(TestFlowError::InvalidStage("time is up")),
            AttemptStage::Taking { index } => Ok(index),
            _ => Err(TestFlowError::InvalidStage("attempt is not taking questions")),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), TestFlowError> {
        if index >= self.test.questions.len() {
            return Err(TestFlowError::Validation(format!(
                "question index {index} is out of range"
            )));
        }
        Ok(())
    }
}

fn question_view(index: usize, question: &Question) -> QuestionView {
    QuestionView {
        index,
        question_id: question.id.clone(),
        text: question.text.clone(),
        kind: question.kind,
        options: question.choices(),
        marks: question.marks,
    }
}
