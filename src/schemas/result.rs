use serde::Serialize;

use crate::models::types::{TestMode, TestStatus};
use crate::models::{OfflineMark, OnlineTestSubmission, Test};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionScore {
    pub question_id: String,
    pub awarded: u32,
    pub max: u32,
    pub is_correct: bool,
}

/// Outcome of scoring one answer map against a test's answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSheet {
    pub score: u32,
    pub total_marks: u32,
    pub breakdown: Vec<QuestionScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub text: String,
    pub given_answer: Option<String>,
    pub correct_answer: String,
    pub awarded: u32,
    pub max: u32,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlineResultDetail {
    pub submission_id: String,
    pub test_id: String,
    pub title: String,
    pub student_id: String,
    pub score: u32,
    pub total_marks: u32,
    pub submitted_at: String,
    pub breakdown: Vec<QuestionOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflineResultDetail {
    pub test_id: String,
    pub title: String,
    pub student_id: String,
    pub marks: u32,
    pub total_marks: u32,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRoster {
    pub test_id: String,
    pub submitted_count: usize,
    pub submissions: Vec<OnlineTestSubmission>,
    pub missing_student_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkingRow {
    pub student_id: String,
    pub mark: Option<OfflineMark>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestAction {
    TakeTest,
    ViewResult,
    ViewMarks,
    ViewSubmissions,
    MarkTest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOverviewEntry {
    pub test_id: String,
    pub title: String,
    pub mode: TestMode,
    pub start_at: String,
    pub duration_minutes: u32,
    pub total_marks: u32,
    pub number_of_questions: Option<usize>,
    pub status: TestStatus,
    pub actions: Vec<TestAction>,
}

impl TestOverviewEntry {
    pub(crate) fn new(test: &Test, status: TestStatus, actions: Vec<TestAction>) -> Self {
        Self {
            test_id: test.id.clone(),
            title: test.title.clone(),
            mode: test.mode,
            start_at: crate::core::time::format_offset(test.start_at),
            duration_minutes: test.duration_minutes,
            total_marks: test.total_marks,
            number_of_questions: test.number_of_questions(),
            status,
            actions,
        }
    }
}
