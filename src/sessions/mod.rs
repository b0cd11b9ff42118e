//! Student attempts: the stage machine and the live session that drives its countdown.

pub mod attempt;
pub(crate) mod registry;
pub mod session;


use std::sync::Arc;

pub use attempt::{Attempt, AttemptStage, TickOutcome};
pub use session::AttemptSession;

use crate::core::state::AppState;
use crate::errors::TestFlowError;
use crate::models::types::TestStatus;
use crate::services::results::test_roster;
use crate::services::test_definitions::fetch_test;
use crate::services::test_status::derive_status;
use registry::AttemptKey;
use session::SessionInner;

/// Opens the attempt of `student_id` on `test_id`, or resumes the live one of this process.
///
/// A new attempt needs an online test with questions, an open window, a student on the test
/// roster and no prior submission.
pub async fn open_attempt(
    state: &AppState,
    test_id: &str,
    student_id: &str,
) -> Result<AttemptSession, TestFlowError> {
    let key = AttemptKey::new(test_id, student_id);
    if let Some(inner) = state.attempts().get(&key) {
        return Ok(AttemptSession::from_inner(inner));
    }

    let test = fetch_test(state, test_id).await?;
    let attempt = Attempt::new(Arc::new(test), student_id)?;
    let test = attempt.test();

    let roster = test_roster(state, test).await?;
    if !roster.iter().any(|id| id == student_id) {
        return Err(TestFlowError::NotFound("Student is not on the test roster".to_string()));
    }

    let existing = state
        .submissions()
        .find_by_test_and_student(test_id, student_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to fetch submission"))?;
    if existing.is_some() {
        return Err(TestFlowError::Conflict(
            "Test already submitted; it cannot be attempted again".to_string(),
        ));
    }

    match derive_status(test, state.now(), false) {
        TestStatus::Due => {}
        TestStatus::Upcoming => {
            return Err(TestFlowError::Conflict("Test has not started yet".to_string()))
        }
        _ => return Err(TestFlowError::Conflict("Test window has closed".to_string())),
    }

    let inner = Arc::new(SessionInner::new(state.clone(), attempt));
    let inner = state.attempts().insert_or_get(key, inner);
    Ok(AttemptSession::from_inner(inner))
}
