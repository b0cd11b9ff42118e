use std::collections::{HashMap, HashSet};

use crate::core::state::AppState;
use crate::core::time::format_offset;
use crate::errors::TestFlowError;
use crate::models::types::{AssignmentTarget, TestMode};
use crate::models::Test;
use crate::schemas::result::{
    MarkingRow, OfflineResultDetail, OnlineResultDetail, QuestionOutcome, SubmissionRoster,
    TestOverviewEntry,
};
use crate::services::question_bank::check_answer;
use crate::services::test_definitions::{fetch_test, list_tests_for_batch};
use crate::services::test_status::{derive_status, grader_actions, status_for_student, student_actions};

/// Students expected to sit `test`: the whole batch, or the assigned subset of it.
pub async fn test_roster(state: &AppState, test: &Test) -> Result<Vec<String>, TestFlowError> {
    let students = state
        .roster()
        .list_students_in_batch(&test.batch_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to fetch batch roster"))?;

    Ok(match test.assignment_target {
        AssignmentTarget::All => students,
        AssignmentTarget::Specific => students
            .into_iter()
            .filter(|student| test.assigned_student_ids.contains(student))
            .collect(),
    })
}

pub(crate) fn is_assigned(test: &Test, student_id: &str) -> bool {
    match test.assignment_target {
        AssignmentTarget::All => true,
        AssignmentTarget::Specific => test.assigned_student_ids.iter().any(|id| id == student_id),
    }
}

pub async fn fetch_online_result(
    state: &AppState,
    test_id: &str,
    student_id: &str,
) -> Result<OnlineResultDetail, TestFlowError> {
    let test = fetch_test(state, test_id).await?;
    ensure_mode(&test, TestMode::Online)?;

    let submission = state
        .submissions()
        .find_by_test_and_student(test_id, student_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| TestFlowError::NotFound("Submission not found".to_string()))?;

    let breakdown = test
        .questions
        .iter()
        .map(|question| {
            let given_answer = submission.answer_for(&question.id).map(str::to_string);
            let is_correct =
                given_answer.as_deref().is_some_and(|given| check_answer(question, given));
            QuestionOutcome {
                question_id: question.id.clone(),
                text: question.text.clone(),
                given_answer,
                correct_answer: question.correct_answer.clone(),
                awarded: if is_correct { question.marks } else { 0 },
                max: question.marks,
                is_correct,
            }
        })
        .collect();

    Ok(OnlineResultDetail {
        submission_id: submission.id,
        test_id: test.id,
        title: test.title,
        student_id: submission.student_id,
        score: submission.score,
        total_marks: test.total_marks,
        submitted_at: format_offset(submission.submitted_at),
        breakdown,
    })
}

pub async fn fetch_offline_result(
    state: &AppState,
    test_id: &str,
    student_id: &str,
) -> Result<OfflineResultDetail, TestFlowError> {
    let test = fetch_test(state, test_id).await?;
    ensure_mode(&test, TestMode::Offline)?;

    let mark = state
        .marks()
        .find_by_test_and_student(test_id, student_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to fetch mark"))?
        .ok_or_else(|| TestFlowError::NotFound("Mark not found".to_string()))?;

    Ok(OfflineResultDetail {
        test_id: test.id,
        title: test.title,
        student_id: mark.student_id,
        marks: mark.marks,
        total_marks: test.total_marks,
        feedback: mark.feedback,
    })
}

/// Submissions of an online test, oldest first, and the roster students still missing.
pub async fn submission_roster(
    state: &AppState,
    test_id: &str,
) -> Result<SubmissionRoster, TestFlowError> {
    let test = fetch_test(state, test_id).await?;
    ensure_mode(&test, TestMode::Online)?;

    let submissions = state
        .submissions()
        .list_by_test(test_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to list submissions"))?;
    let submitted: HashSet<&str> =
        submissions.iter().map(|submission| submission.student_id.as_str()).collect();

    let missing_student_ids = test_roster(state, &test)
        .await?
        .into_iter()
        .filter(|student| !submitted.contains(student.as_str()))
        .collect();

    Ok(SubmissionRoster {
        test_id: test.id,
        submitted_count: submissions.len(),
        submissions,
        missing_student_ids,
    })
}

/// One row per roster student of an offline test, with the mark if one is recorded.
pub async fn offline_marking_roster(
    state: &AppState,
    test_id: &str,
) -> Result<Vec<MarkingRow>, TestFlowError> {
    let test = fetch_test(state, test_id).await?;
    ensure_mode(&test, TestMode::Offline)?;

    let mut marks: HashMap<String, _> = state
        .marks()
        .list_by_test(test_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to list marks"))?
        .into_iter()
        .map(|mark| (mark.student_id.clone(), mark))
        .collect();

    Ok(test_roster(state, &test)
        .await?
        .into_iter()
        .map(|student_id| {
            let mark = marks.remove(&student_id);
            MarkingRow { student_id, mark }
        })
        .collect())
}

/// Every batch test the student is assigned, newest first, with status and actions.
pub async fn student_overview(
    state: &AppState,
    batch_id: &str,
    student_id: &str,
) -> Result<Vec<TestOverviewEntry>, TestFlowError> {
    let tests = list_tests_for_batch(state, batch_id).await?;

    let mut entries = Vec::with_capacity(tests.len());
    for test in tests.iter().filter(|test| is_assigned(test, student_id)) {
        let status = status_for_student(state, test, student_id).await?;
        entries.push(TestOverviewEntry::new(test, status, student_actions(test, status)));
    }
    Ok(entries)
}

pub async fn grader_overview(
    state: &AppState,
    batch_id: &str,
) -> Result<Vec<TestOverviewEntry>, TestFlowError> {
    let now = state.now();
    Ok(list_tests_for_batch(state, batch_id)
        .await?
        .iter()
        .map(|test| {
            TestOverviewEntry::new(test, derive_status(test, now, false), grader_actions(test, now))
        })
        .collect())
}

fn ensure_mode(test: &Test, expected: TestMode) -> Result<(), TestFlowError> {
    if test.mode == expected {
        return Ok(());
    }
    Err(TestFlowError::Validation(match expected {
        TestMode::Online => "test is not an online test".to_string(),
        TestMode::Offline => "test is not an offline test".to_string(),
    }))
}
