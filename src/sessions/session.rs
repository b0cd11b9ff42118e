use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use super::attempt::{Attempt, AttemptStage, TickOutcome};
use super::registry::AttemptKey;
use crate::core::state::AppState;
use crate::errors::TestFlowError;
use crate::models::types::FinalizeMode;
use crate::models::OnlineTestSubmission;
use crate::schemas::attempt::{InstructionsView, ReviewSummary, TakingView};
use crate::services::submission_finalize::finalize_submission;
use crate::tasks::countdown::{CountdownHandle, CountdownTarget, TickControl};

/// Handle to a live attempt. Clones share the same attempt and countdown.
#[derive(Clone)]
pub struct AttemptSession {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    state: AppState,
    key: AttemptKey,
    core: Mutex<SessionCore>,
}

struct SessionCore {
    attempt: Attempt,
    countdown: Option<CountdownHandle>,
}

impl SessionCore {
    fn stop_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.cancel();
        }
    }
}

impl SessionInner {
    pub(crate) fn new(state: AppState, attempt: Attempt) -> Self {
        let key = AttemptKey::new(&attempt.test().id, attempt.student_id());
        Self { state, key, core: Mutex::new(SessionCore { attempt, countdown: None }) }
    }

    /// Scores and stores the current answers. On failure the attempt is parked in review.
    async fn finalize_locked(
        &self,
        core: &mut SessionCore,
        mode: FinalizeMode,
    ) -> Result<OnlineTestSubmission, TestFlowError> {
        let answers = core.attempt.answers().clone();
        let result = finalize_submission(
            &self.state,
            core.attempt.test(),
            core.attempt.student_id(),
            &answers,
            mode,
        )
        .await;

        match result {
            Ok(result) => {
                core.attempt.complete(result.submission.clone());
                Ok(result.submission)
            }
            Err(err) => {
                core.attempt.recover_to_review();
                tracing::error!(
                    test_id = %self.key.test_id,
                    student_id = %self.key.student_id,
                    mode = mode.as_str(),
                    error = %err,
                    "Finalize failed; attempt kept in review"
                );
                Err(err)
            }
        }
    }
}

#[async_trait]
impl CountdownTarget for SessionInner {
    async fn on_tick(&self) -> TickControl {
        let mut core = self.core.lock().await;
        match core.attempt.tick() {
            TickOutcome::Running(_) => TickControl::Continue,
            TickOutcome::Idle => TickControl::Stop,
            TickOutcome::Expired => {
                tracing::info!(
                    test_id = %self.key.test_id,
                    student_id = %self.key.student_id,
                    stage = core.attempt.stage().name(),
                    answered = core.attempt.answers().len(),
                    "Time is up; submitting automatically"
                );
                // The countdown ends by returning Stop; its handle stays put.
                let _ = self.finalize_locked(&mut core, FinalizeMode::AutoDeadline).await;
                TickControl::Stop
            }
        }
    }
}

impl AttemptSession {
    pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    pub fn test_id(&self) -> &str {
        &self.inner.key.test_id
    }

    pub fn student_id(&self) -> &str {
        &self.inner.key.student_id
    }

    pub async fn stage(&self) -> AttemptStage {
        self.lock().await.attempt.stage().clone()
    }

    pub async fn remaining_seconds(&self) -> u64 {
        self.lock().await.attempt.remaining_seconds()
    }

    pub async fn instructions(&self) -> InstructionsView {
        self.lock().await.attempt.instructions()
    }

    /// Starts the countdown at `duration_minutes * 60` and shows the first question.
    pub async fn start(&self) -> Result<TakingView, TestFlowError> {
        let mut core = self.lock().await;
        core.attempt.start()?;
        core.countdown = Some(CountdownHandle::spawn(
            self.inner.state.settings().tick_period(),
            Arc::downgrade(&self.inner),
        ));

        metrics::counter!("attempts_started_total").increment(1);
        tracing::info!(
            test_id = %self.inner.key.test_id,
            student_id = %self.inner.key.student_id,
            remaining_seconds = core.attempt.remaining_seconds(),
            "Attempt started"
        );
        core.attempt.taking_view()
    }

    pub async fn taking_view(&self) -> Result<TakingView, TestFlowError> {
        self.lock().await.attempt.taking_view()
    }

    pub async fn answer(&self, answer: &str) -> Result<TakingView, TestFlowError> {
        let mut core = self.lock().await;
        core.attempt.answer(answer)?;
        core.attempt.taking_view()
    }

    pub async fn go_to(&self, index: usize) -> Result<TakingView, TestFlowError> {
        let mut core = self.lock().await;
        core.attempt.go_to(index)?;
        core.attempt.taking_view()
    }

    pub async fn next(&self) -> Result<TakingView, TestFlowError> {
        let mut core = self.lock().await;
        core.attempt.next()?;
        core.attempt.taking_view()
    }

    pub async fn previous(&self) -> Result<TakingView, TestFlowError> {
        let mut core = self.lock().await;
        core.attempt.previous()?;
        core.attempt.taking_view()
    }

    pub async fn request_review(&self) -> Result<ReviewSummary, TestFlowError> {
        let mut core = self.lock().await;
        core.attempt.request_review()?;
        tracing::debug!(
            test_id = %self.inner.key.test_id,
            student_id = %self.inner.key.student_id,
            remaining_seconds = core.attempt.remaining_seconds(),
            "Review requested"
        );
        core.attempt.review_summary()
    }

    pub async fn review_summary(&self) -> Result<ReviewSummary, TestFlowError> {
        self.lock().await.attempt.review_summary()
    }

    pub async fn edit_answer(&self, index: usize) -> Result<TakingView, TestFlowError> {
        let mut core = self.lock().await;
        core.attempt.edit_answer(index)?;
        core.attempt.taking_view()
    }

    /// Final submit from review. Repeated calls return the stored submission.
    pub async fn submit(&self) -> Result<OnlineTestSubmission, TestFlowError> {
        let mut core = self.lock().await;
        if let Some(submission) = core.attempt.submission() {
            return Ok(submission.clone());
        }
        if !core.attempt.can_finalize() {
            return Err(TestFlowError::InvalidStage("submit is only allowed from review"));
        }

        let mode = if core.attempt.is_expired() {
            FinalizeMode::AutoDeadline
        } else {
            FinalizeMode::ManualSubmit
        };
        let submission = self.inner.finalize_locked(&mut core, mode).await?;
        core.stop_countdown();
        Ok(submission)
    }

    pub async fn submission(&self) -> Option<OnlineTestSubmission> {
        self.lock().await.attempt.submission().cloned()
    }

    /// Leaves the attempt: the countdown stops and unsaved answers are discarded.
    pub async fn abandon(&self) {
        let mut core = self.lock().await;
        core.stop_countdown();
        let discarded = core.attempt.answers().len();
        if core.attempt.reset() {
            tracing::info!(
                test_id = %self.inner.key.test_id,
                student_id = %self.inner.key.student_id,
                discarded,
                "Attempt abandoned"
            );
        }
        self.inner.state.attempts().remove(&self.inner.key, &self.inner);
    }

    async fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.inner.core.lock().await
    }
}
