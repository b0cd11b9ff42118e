use std::collections::BTreeMap;

use uuid::Uuid;

use crate::core::state::AppState;
use crate::errors::TestFlowError;
use crate::models::types::FinalizeMode;
use crate::models::{OnlineTestSubmission, StudentAnswer, Test};
use crate::repositories::CreateOutcome;
use crate::services::scoring::score_online_attempt;

#[derive(Debug, Clone)]
pub struct FinalizeSubmissionResult {
    pub submission: OnlineTestSubmission,
    /// The pair was already submitted; `submission` is the stored record, not this attempt's answers.
    pub duplicate: bool,
}

/// Scores `answers` and stores the submission for (test, student) unless one exists.
///
/// A second call for the same pair is a no-op that returns the stored record.
pub async fn finalize_submission(
    state: &AppState,
    test: &Test,
    student_id: &str,
    answers: &BTreeMap<String, String>,
    mode: FinalizeMode,
) -> Result<FinalizeSubmissionResult, TestFlowError> {
    let sheet = score_online_attempt(test, answers);

    let submission = OnlineTestSubmission {
        id: Uuid::new_v4().to_string(),
        test_id: test.id.clone(),
        student_id: student_id.to_string(),
        answers: answers
            .iter()
            .filter(|(question_id, _)| test.question(question_id).is_some())
            .map(|(question_id, answer)| StudentAnswer {
                question_id: question_id.clone(),
                answer: answer.clone(),
            })
            .collect(),
        score: sheet.score,
        submitted_at: state.now(),
        finalized_by: mode,
    };

    let outcome = state
        .submissions()
        .create_if_absent(submission)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to create submission"))?;

    match outcome {
        CreateOutcome::Created(submission) => {
            metrics::counter!("submissions_total", "mode" => mode.as_str()).increment(1);
            if sheet.total_marks > 0 {
                metrics::histogram!("submission_score_ratio")
                    .record(f64::from(submission.score) / f64::from(sheet.total_marks));
            }
            tracing::info!(
                test_id = %submission.test_id,
                student_id = %submission.student_id,
                submission_id = %submission.id,
                score = submission.score,
                total_marks = sheet.total_marks,
                answered = submission.answers.len(),
                mode = mode.as_str(),
                "Submission finalized"
            );
            Ok(FinalizeSubmissionResult { submission, duplicate: false })
        }
        CreateOutcome::Existing(submission) => {
            metrics::counter!("duplicate_submissions_total").increment(1);
            tracing::warn!(
                test_id = %submission.test_id,
                student_id = %submission.student_id,
                submission_id = %submission.id,
                mode = mode.as_str(),
                "Submission already exists; keeping the stored record"
            );
            Ok(FinalizeSubmissionResult { submission, duplicate: true })
        }
    }
}
