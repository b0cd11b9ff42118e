use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::core::{clock::ManualClock, config::Settings, state::AppState};
use crate::models::types::AssignmentTarget;
use crate::models::{OnlineTestSubmission, Test};
use crate::repositories::{
    CreateOutcome, InMemoryRoster, InMemorySubmissionStore, StoreError, Stores, SubmissionStore,
};
use crate::schemas::{OfflineTestCreate, OnlineTestCreate, QuestionCreate};
use crate::services::test_definitions::{build_offline_test, build_online_test};

pub(crate) const BATCH_ID: &str = "batch-1";
pub(crate) const STUDENTS: [&str; 3] = ["s1", "s2", "s3"];

pub(crate) fn start_instant() -> OffsetDateTime {
    datetime!(2025-03-01 09:00 UTC)
}

pub(crate) fn sample_questions() -> Vec<QuestionCreate> {
    vec![
        QuestionCreate::mcq("Which gas do plants absorb?", &["A", "B", "C", "D"], "B", 5),
        QuestionCreate::yes_no("Is chlorophyll green?", "Yes", 2),
    ]
}

pub(crate) fn online_test_at(start_at: OffsetDateTime, duration_minutes: i64) -> Test {
    build_online_test(
        OnlineTestCreate {
            title: "Photosynthesis quiz".to_string(),
            batch_id: BATCH_ID.to_string(),
            start_at,
            duration_minutes,
            questions: sample_questions(),
            assignment_target: AssignmentTarget::All,
            assigned_student_ids: Vec::new(),
        },
        Settings::default().limits(),
        start_at - Duration::days(1),
    )
    .expect("valid online test")
}

pub(crate) fn online_test_with(questions: Vec<QuestionCreate>) -> Test {
    build_online_test(
        OnlineTestCreate {
            title: "Custom quiz".to_string(),
            batch_id: BATCH_ID.to_string(),
            start_at: start_instant(),
            duration_minutes: 30,
            questions,
            assignment_target: AssignmentTarget::All,
            assigned_student_ids: Vec::new(),
        },
        Settings::default().limits(),
        start_instant() - Duration::days(1),
    )
    .expect("valid online test")
}

/// MCQ worth 5 (answer "B") and yes/no worth 2 (answer "Yes"), 30 minutes.
pub(crate) fn sample_online_test() -> Test {
    online_test_at(start_instant(), 30)
}

pub(crate) fn offline_test_at(start_at: OffsetDateTime, total_marks: i64) -> Test {
    build_offline_test(
        OfflineTestCreate {
            title: "Lab practical".to_string(),
            batch_id: BATCH_ID.to_string(),
            start_at,
            duration_minutes: 90,
            total_marks,
            assignment_target: AssignmentTarget::All,
            assigned_student_ids: Vec::new(),
        },
        Settings::default().limits(),
        start_at - Duration::days(1),
    )
    .expect("valid offline test")
}

/// Submission store that fails every call while `failing` is set.
#[derive(Default)]
pub(crate) struct FlakySubmissionStore {
    inner: InMemorySubmissionStore,
    failing: AtomicBool,
}

impl FlakySubmissionStore {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("submission store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for FlakySubmissionStore {
    async fn create_if_absent(
        &self,
        submission: OnlineTestSubmission,
    ) -> Result<CreateOutcome, StoreError> {
        self.check()?;
        self.inner.create_if_absent(submission).await
    }

    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<OnlineTestSubmission>, StoreError> {
        self.check()?;
        self.inner.find_by_test_and_student(test_id, student_id).await
    }

    async fn list_by_test(&self, test_id: &str) -> Result<Vec<OnlineTestSubmission>, StoreError> {
        self.check()?;
        self.inner.list_by_test(test_id).await
    }

    async fn list_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<OnlineTestSubmission>, StoreError> {
        self.check()?;
        self.inner.list_by_student(student_id).await
    }
}

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) roster: Arc<InMemoryRoster>,
    pub(crate) submissions: Arc<FlakySubmissionStore>,
}

impl TestContext {
    pub(crate) async fn seed(&self, test: Test) -> Test {
        self.state.tests().insert(test.clone()).await.expect("insert test");
        test
    }

    pub(crate) async fn seed_online_test(&self) -> Test {
        self.seed(sample_online_test()).await
    }

    pub(crate) async fn seed_offline_test(&self, total_marks: i64) -> Test {
        self.seed(offline_test_at(start_instant(), total_marks)).await
    }

    /// Puts the wall clock inside the window of `test`.
    pub(crate) fn open_window(&self, test: &Test) {
        self.clock.set(test.start_at + Duration::minutes(1));
    }
}

/// Batch `batch-1` with students s1..s3; the clock sits one hour before `start_instant`.
pub(crate) async fn setup_test_context() -> TestContext {
    let clock = Arc::new(ManualClock::new(start_instant() - Duration::hours(1)));
    let roster = Arc::new(InMemoryRoster::default());
    for student in STUDENTS {
        roster.enroll(BATCH_ID, student).await;
    }

    let submissions = Arc::new(FlakySubmissionStore::default());
    let stores = Stores {
        submissions: submissions.clone(),
        ..Stores::in_memory(roster.clone())
    };

    let state = AppState::new(Settings::default(), clock.clone(), stores);
    TestContext { state, clock, roster, submissions }
}

pub(crate) async fn setup_failing_context() -> TestContext {
    let ctx = setup_test_context().await;
    ctx.submissions.set_failing(true);
    ctx
}
