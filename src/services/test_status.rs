use time::OffsetDateTime;

use crate::core::state::AppState;
use crate::errors::TestFlowError;
use crate::models::types::{TestMode, TestStatus};
use crate::models::Test;
use crate::schemas::result::TestAction;

/// Status of `test` for one student at `now`.
///
/// `has_record` is whether the student has a submission (online) or a mark
/// (offline). The window is closed on both ends: at exactly `start_at` and at
/// exactly `end_at` an unsubmitted online test is still `Due`.
pub fn derive_status(test: &Test, now: OffsetDateTime, has_record: bool) -> TestStatus {
    match test.mode {
        TestMode::Online => {
            let ended = now > test.end_at();
            match (has_record, ended) {
                (true, true) => TestStatus::Completed,
                (true, false) => TestStatus::Submitted,
                (false, true) => TestStatus::Missed,
                (false, false) if now < test.start_at => TestStatus::Upcoming,
                (false, false) => TestStatus::Due,
            }
        }
        TestMode::Offline => {
            if has_record {
                TestStatus::Marked
            } else if now > test.start_at {
                TestStatus::PendingMarking
            } else {
                TestStatus::Upcoming
            }
        }
    }
}

/// Re-reads the student's record on every call; nothing is cached.
pub async fn status_for_student(
    state: &AppState,
    test: &Test,
    student_id: &str,
) -> Result<TestStatus, TestFlowError> {
    let has_record = match test.mode {
        TestMode::Online => state
            .submissions()
            .find_by_test_and_student(&test.id, student_id)
            .await
            .map_err(|e| TestFlowError::internal(e, "Failed to fetch submission"))?
            .is_some(),
        TestMode::Offline => state
            .marks()
            .find_by_test_and_student(&test.id, student_id)
            .await
            .map_err(|e| TestFlowError::internal(e, "Failed to fetch mark"))?
            .is_some(),
    };

    Ok(derive_status(test, state.now(), has_record))
}

pub fn student_actions(test: &Test, status: TestStatus) -> Vec<TestAction> {
    match (test.mode, status) {
        (TestMode::Online, TestStatus::Due) => vec![TestAction::TakeTest],
        (TestMode::Online, TestStatus::Submitted | TestStatus::Completed) => {
            vec![TestAction::ViewResult]
        }
        (TestMode::Offline, TestStatus::Marked) => vec![TestAction::ViewMarks],
        _ => Vec::new(),
    }
}

/// Actions for the grader, who has no record of their own: only the window matters.
pub fn grader_actions(test: &Test, now: OffsetDateTime) -> Vec<TestAction> {
    if derive_status(test, now, false) == TestStatus::Upcoming {
        return Vec::new();
    }
    match test.mode {
        TestMode::Online => vec![TestAction::ViewSubmissions],
        TestMode::Offline => vec![TestAction::MarkTest],
    }
}
