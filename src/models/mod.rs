pub mod types;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::time::window_end;
use crate::models::types::{AssignmentTarget, FinalizeMode, QuestionKind, TestMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub marks: u32,
}

pub const YES: &str = "Yes";
pub const NO: &str = "No";

impl Question {
    /// Choices offered to the student; fill-in-blank questions offer none.
    pub fn choices(&self) -> Vec<String> {
        match self.kind {
            QuestionKind::Mcq => self.options.clone(),
            QuestionKind::YesNo => vec![YES.to_string(), NO.to_string()],
            QuestionKind::FillInBlanks => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    pub duration_minutes: u32,
    pub total_marks: u32,
    pub batch_id: String,
    pub mode: TestMode,
    /// Always empty for offline tests.
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub assignment_target: AssignmentTarget,
    #[serde(default)]
    pub assigned_student_ids: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Test {
    pub fn end_at(&self) -> OffsetDateTime {
        window_end(self.start_at, self.duration_minutes)
    }

    pub fn number_of_questions(&self) -> Option<usize> {
        match self.mode {
            TestMode::Online => Some(self.questions.len()),
            TestMode::Offline => None,
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }

    /// `None` when the marks do not fit in `u32`.
    pub fn question_marks_sum(&self) -> Option<u32> {
        sum_marks(&self.questions)
    }
}

pub(crate) fn sum_marks<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Option<u32> {
    questions
        .into_iter()
        .try_fold(0u32, |acc, question| acc.checked_add(question.marks))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswer {
    pub question_id: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineTestSubmission {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub answers: Vec<StudentAnswer>,
    pub score: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub finalized_by: FinalizeMode,
}

impl OnlineTestSubmission {
    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|answer| answer.question_id == question_id)
            .map(|answer| answer.answer.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineMark {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub marks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
