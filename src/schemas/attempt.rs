use serde::Serialize;

use crate::models::types::QuestionKind;

/// A question as shown to the student; the answer key is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub question_id: String,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub marks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteEntry {
    pub index: usize,
    pub answered: bool,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TakingView {
    pub question: QuestionView,
    pub current_answer: Option<String>,
    pub position_label: String,
    pub progress_percent: f64,
    pub is_last: bool,
    pub palette: Vec<PaletteEntry>,
    pub remaining_seconds: u64,
    pub remaining_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    pub index: usize,
    pub question_id: String,
    pub text: String,
    pub answer: Option<String>,
    pub answered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub entries: Vec<ReviewEntry>,
    pub answered_count: usize,
    pub unanswered_count: usize,
    pub remaining_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionsView {
    pub title: String,
    pub duration_minutes: u32,
    pub total_questions: usize,
    pub total_marks: u32,
}
