use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::core::config::{Settings, TestLimits};
use crate::core::state::AppState;
use crate::errors::TestFlowError;
use crate::models::types::{AssignmentTarget, TestMode};
use crate::core::time::checked_window_end;
use crate::models::{sum_marks, Question, Test};
use crate::schemas::{OfflineTestCreate, OnlineTestCreate, QuestionCreate};
use crate::services::question_bank;

/// An online test being authored. `total_marks` is re-derived after every question mutation.
#[derive(Debug, Clone)]
pub struct TestDraft {
    title: String,
    batch_id: String,
    start_at: OffsetDateTime,
    duration_minutes: u32,
    questions: Vec<Question>,
    total_marks: u32,
    assignment_target: AssignmentTarget,
    assigned_student_ids: Vec<String>,
}

impl TestDraft {
    pub fn new(title: &str, batch_id: &str, start_at: OffsetDateTime, duration_minutes: u32) -> Self {
        Self {
            title: title.to_string(),
            batch_id: batch_id.to_string(),
            start_at,
            duration_minutes,
            questions: Vec::new(),
            total_marks: 0,
            assignment_target: AssignmentTarget::All,
            assigned_student_ids: Vec::new(),
        }
    }

    pub fn with_default_duration(
        settings: &Settings,
        title: &str,
        batch_id: &str,
        start_at: OffsetDateTime,
    ) -> Self {
        Self::new(title, batch_id, start_at, settings.attempt().default_duration_minutes)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    pub fn assign_to(&mut self, target: AssignmentTarget, student_ids: Vec<String>) {
        self.assignment_target = target;
        self.assigned_student_ids = student_ids;
    }

    pub fn add_question(&mut self, payload: QuestionCreate) -> Result<&Question, TestFlowError> {
        let question = question_bank::create_question(payload)?;
        let total_marks = self.total_with(None, &question)?;
        self.questions.push(question);
        self.total_marks = total_marks;
        let index = self.questions.len() - 1;
        Ok(&self.questions[index])
    }

    /// Replaces the question at `index`, keeping its id.
    pub fn update_question(
        &mut self,
        index: usize,
        payload: QuestionCreate,
    ) -> Result<&Question, TestFlowError> {
        let id = self
            .questions
            .get(index)
            .map(|question| question.id.clone())
            .ok_or_else(|| TestFlowError::NotFound(format!("Question {} not found", index + 1)))?;
        let question = question_bank::build_question(id, payload)?;
        let total_marks = self.total_with(Some(index), &question)?;
        self.questions[index] = question;
        self.total_marks = total_marks;
        Ok(&self.questions[index])
    }

    pub fn remove_question(&mut self, index: usize) -> Result<Question, TestFlowError> {
        if index >= self.questions.len() {
            return Err(TestFlowError::NotFound(format!("Question {} not found", index + 1)));
        }
        let removed = self.questions.remove(index);
        self.total_marks -= removed.marks;
        Ok(removed)
    }

    /// Validates and stores the draft as a final online test.
    pub async fn publish(self, state: &AppState) -> Result<Test, TestFlowError> {
        let test = self.into_test(state.settings().limits(), state.now())?;
        insert_test(state, test).await
    }

    pub(crate) fn into_test(self, limits: &TestLimits, now: OffsetDateTime) -> Result<Test, TestFlowError> {
        if self.title.trim().is_empty() {
            return Err(TestFlowError::Validation("title must not be empty".to_string()));
        }
        if self.batch_id.trim().is_empty() {
            return Err(TestFlowError::Validation("batch_id must not be empty".to_string()));
        }
        if self.duration_minutes == 0 {
            return Err(TestFlowError::Validation("duration_minutes must be positive".to_string()));
        }
        assemble_online_test(
            OnlineFields {
                title: self.title,
                batch_id: self.batch_id,
                start_at: self.start_at,
                duration_minutes: self.duration_minutes,
                assignment_target: self.assignment_target,
                assigned_student_ids: self.assigned_student_ids,
            },
            self.questions,
            limits,
            now,
        )
    }

    /// Total after putting `question` at `replacing` (or appending it).
    fn total_with(&self, replacing: Option<usize>, question: &Question) -> Result<u32, TestFlowError> {
        let kept = self
            .questions
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != replacing)
            .map(|(_, kept)| kept);
        sum_marks(kept.chain(std::iter::once(question))).ok_or_else(marks_overflow)
    }
}

struct OnlineFields {
    title: String,
    batch_id: String,
    start_at: OffsetDateTime,
    duration_minutes: u32,
    assignment_target: AssignmentTarget,
    assigned_student_ids: Vec<String>,
}

pub fn build_online_test(
    payload: OnlineTestCreate,
    limits: &TestLimits,
    now: OffsetDateTime,
) -> Result<Test, TestFlowError> {
    payload.validate()?;
    let duration_minutes = to_u32("duration_minutes", payload.duration_minutes)?;

    let questions = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, question)| {
            question_bank::create_question(question).map_err(|err| match err {
                TestFlowError::Validation(message) => {
                    TestFlowError::Validation(format!("question {}: {message}", index + 1))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    assemble_online_test(
        OnlineFields {
            title: payload.title,
            batch_id: payload.batch_id,
            start_at: payload.start_at,
            duration_minutes,
            assignment_target: payload.assignment_target,
            assigned_student_ids: payload.assigned_student_ids,
        },
        questions,
        limits,
        now,
    )
}

fn assemble_online_test(
    fields: OnlineFields,
    questions: Vec<Question>,
    limits: &TestLimits,
    now: OffsetDateTime,
) -> Result<Test, TestFlowError> {
    if questions.len() > limits.max_questions {
        return Err(TestFlowError::Validation(format!(
            "an online test may hold at most {} questions",
            limits.max_questions
        )));
    }

    check_window(fields.start_at, fields.duration_minutes)?;
    let total_marks = sum_marks(&questions).ok_or_else(marks_overflow)?;

    let assigned_student_ids =
        normalize_assignment(fields.assignment_target, fields.assigned_student_ids)?;

    Ok(Test {
        id: Uuid::new_v4().to_string(),
        title: fields.title,
        start_at: fields.start_at,
        duration_minutes: fields.duration_minutes,
        total_marks,
        batch_id: fields.batch_id,
        mode: TestMode::Online,
        questions,
        assignment_target: fields.assignment_target,
        assigned_student_ids,
        created_at: now,
    })
}

pub fn build_offline_test(
    payload: OfflineTestCreate,
    limits: &TestLimits,
    now: OffsetDateTime,
) -> Result<Test, TestFlowError> {
    payload.validate()?;
    let duration_minutes = to_u32("duration_minutes", payload.duration_minutes)?;
    check_window(payload.start_at, duration_minutes)?;
    let total_marks = to_u32("total_marks", payload.total_marks)?;
    if total_marks > limits.max_total_marks {
        return Err(TestFlowError::Validation(format!(
            "total_marks must not exceed {}",
            limits.max_total_marks
        )));
    }

    let assigned_student_ids =
        normalize_assignment(payload.assignment_target, payload.assigned_student_ids)?;

    Ok(Test {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        start_at: payload.start_at,
        duration_minutes,
        total_marks,
        batch_id: payload.batch_id,
        mode: TestMode::Offline,
        questions: Vec::new(),
        assignment_target: payload.assignment_target,
        assigned_student_ids,
        created_at: now,
    })
}

pub async fn create_online_test(
    state: &AppState,
    payload: OnlineTestCreate,
) -> Result<Test, TestFlowError> {
    let test = build_online_test(payload, state.settings().limits(), state.now())?;
    insert_test(state, test).await
}

pub async fn create_offline_test(
    state: &AppState,
    payload: OfflineTestCreate,
) -> Result<Test, TestFlowError> {
    let test = build_offline_test(payload, state.settings().limits(), state.now())?;
    insert_test(state, test).await
}

pub async fn fetch_test(state: &AppState, test_id: &str) -> Result<Test, TestFlowError> {
    state
        .tests()
        .find_by_id(test_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to fetch test"))?
        .ok_or_else(|| TestFlowError::NotFound("Test not found".to_string()))
}

/// Tests of a batch, newest start first.
pub async fn list_tests_for_batch(
    state: &AppState,
    batch_id: &str,
) -> Result<Vec<Test>, TestFlowError> {
    state
        .tests()
        .list_by_batch(batch_id)
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to list tests"))
}

async fn insert_test(state: &AppState, test: Test) -> Result<Test, TestFlowError> {
    state
        .tests()
        .insert(test.clone())
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to store test"))?;

    tracing::info!(
        test_id = %test.id,
        batch_id = %test.batch_id,
        mode = ?test.mode,
        questions = test.questions.len(),
        total_marks = test.total_marks,
        "Test scheduled"
    );
    Ok(test)
}

fn normalize_assignment(
    target: AssignmentTarget,
    student_ids: Vec<String>,
) -> Result<Vec<String>, TestFlowError> {
    match target {
        AssignmentTarget::All => Ok(Vec::new()),
        AssignmentTarget::Specific => {
            let mut ids: Vec<String> = student_ids
                .into_iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
            ids.sort();
            ids.dedup();
            if ids.is_empty() {
                return Err(TestFlowError::Validation(
                    "assigned_student_ids must not be empty for a specific assignment".to_string(),
                ));
            }
            Ok(ids)
        }
    }
}

fn check_window(start_at: OffsetDateTime, duration_minutes: u32) -> Result<(), TestFlowError> {
    checked_window_end(start_at, duration_minutes).map(|_| ()).ok_or_else(|| {
        TestFlowError::Validation("duration_minutes runs past the last representable date".to_string())
    })
}

fn marks_overflow() -> TestFlowError {
    TestFlowError::Validation("total marks overflow".to_string())
}

fn to_u32(field: &str, value: i64) -> Result<u32, TestFlowError> {
    u32::try_from(value).map_err(|_| TestFlowError::Validation(format!("{field} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use time::macros::datetime;

    fn online_payload(questions: Vec<QuestionCreate>) -> OnlineTestCreate {
        OnlineTestCreate {
            title: "Unit test".to_string(),
            batch_id: "batch-1".to_string(),
            start_at: datetime!(2025-03-01 09:00 UTC),
            duration_minutes: 30,
            questions,
            assignment_target: AssignmentTarget::All,
            assigned_student_ids: Vec::new(),
        }
    }

    #[test]
    fn online_total_is_sum_of_question_marks() {
        let test = build_online_test(
            online_payload(vec![
                QuestionCreate::mcq("Q1", &["A", "B", "C", "D"], "B", 5),
                QuestionCreate::yes_no("Q2", "Yes", 2),
            ]),
            &Settings::default().limits().clone(),
            datetime!(2025-02-01 00:00 UTC),
        )
        .unwrap();

        assert_eq!(test.mode, TestMode::Online);
        assert_eq!(test.total_marks, 7);
        assert_eq!(test.question_marks_sum(), Some(test.total_marks));
        assert_eq!(test.number_of_questions(), Some(2));
    }

    #[test]
    fn invalid_question_is_reported_with_its_position() {
        let err = build_online_test(
            online_payload(vec![
                QuestionCreate::yes_no("Q1", "Yes", 1),
                QuestionCreate::mcq("Q2", &["A", "B"], "C", 1),
            ]),
            Settings::default().limits(),
            datetime!(2025-02-01 00:00 UTC),
        )
        .unwrap_err();
        assert!(matches!(err, TestFlowError::Validation(message) if message.starts_with("question 2:")));
    }

    #[test]
    fn question_cap_is_enforced() {
        let limits = TestLimits { max_questions: 1, max_total_marks: 100 };
        let err = build_online_test(
            online_payload(vec![
                QuestionCreate::yes_no("Q1", "Yes", 1),
                QuestionCreate::yes_no("Q2", "No", 1),
            ]),
            &limits,
            datetime!(2025-02-01 00:00 UTC),
        )
        .unwrap_err();
        assert!(matches!(err, TestFlowError::Validation(_)));
    }

    #[test]
    fn specific_assignment_needs_students() {
        let mut payload = online_payload(Vec::new());
        payload.assignment_target = AssignmentTarget::Specific;
        payload.assigned_student_ids = vec![" ".to_string()];
        assert!(build_online_test(payload.clone(), Settings::default().limits(), datetime!(2025-02-01 00:00 UTC)).is_err());

        payload.assigned_student_ids = vec!["s2".to_string(), "s1".to_string(), "s2".to_string()];
        let test = build_online_test(payload, Settings::default().limits(), datetime!(2025-02-01 00:00 UTC)).unwrap();
        assert_eq!(test.assigned_student_ids, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn offline_test_keeps_explicit_total_and_no_questions() {
        let test = build_offline_test(
            OfflineTestCreate {
                title: "Lab".to_string(),
                batch_id: "batch-1".to_string(),
                start_at: datetime!(2025-03-01 09:00 UTC),
                duration_minutes: 120,
                total_marks: 100,
                assignment_target: AssignmentTarget::All,
                assigned_student_ids: vec!["ignored".to_string()],
            },
            Settings::default().limits(),
            datetime!(2025-02-01 00:00 UTC),
        )
        .unwrap();

        assert_eq!(test.mode, TestMode::Offline);
        assert_eq!(test.total_marks, 100);
        assert!(test.questions.is_empty());
        assert!(test.assigned_student_ids.is_empty());
        assert_eq!(test.number_of_questions(), None);
    }

    #[test]
    fn draft_total_follows_every_mutation() {
        let mut draft = TestDraft::new("Draft", "batch-1", datetime!(2025-03-01 09:00 UTC), 20);
        assert_eq!(draft.total_marks(), 0);

        draft.add_question(QuestionCreate::mcq("Q1", &["A", "B"], "A", 5)).unwrap();
        draft.add_question(QuestionCreate::yes_no("Q2", "No", 2)).unwrap();
        assert_eq!(draft.total_marks(), 7);

        let original_id = draft.questions()[0].id.clone();
        let updated = draft.update_question(0, QuestionCreate::mcq("Q1", &["A", "B"], "B", 10)).unwrap();
        assert_eq!(updated.id, original_id);
        assert_eq!(draft.total_marks(), 12);

        draft.remove_question(1).unwrap();
        assert_eq!(draft.total_marks(), 10);
        assert_eq!(draft.total_marks(), draft.questions().iter().map(|q| q.marks).sum::<u32>());

        assert!(draft.remove_question(5).unwrap_err().is_not_found());
    }

    #[test]
    fn draft_rejects_marks_that_overflow_the_total() {
        let mut draft = TestDraft::new("Draft", "batch-1", datetime!(2025-03-01 09:00 UTC), 20);
        draft.add_question(QuestionCreate::yes_no("Q1", "Yes", 3_000_000_000)).unwrap();

        let err = draft.add_question(QuestionCreate::yes_no("Q2", "Yes", 3_000_000_000)).unwrap_err();
        assert!(matches!(err, TestFlowError::Validation(_)));
        assert_eq!(draft.questions().len(), 1);
        assert_eq!(draft.total_marks(), 3_000_000_000);

        draft.add_question(QuestionCreate::yes_no("Q2", "No", 1)).unwrap();
        assert!(draft.update_question(1, QuestionCreate::yes_no("Q2", "No", 2_000_000_000)).is_err());
        assert_eq!(draft.questions()[1].marks, 1);
        assert_eq!(draft.total_marks(), 3_000_000_001);

        // Replacing the large question frees room for the other one.
        draft.update_question(0, QuestionCreate::yes_no("Q1", "Yes", 1)).unwrap();
        draft.update_question(1, QuestionCreate::yes_no("Q2", "No", 4_000_000_000)).unwrap();
        assert_eq!(draft.total_marks(), 4_000_000_001);
    }

    #[test]
    fn online_test_with_overflowing_marks_is_rejected() {
        let err = build_online_test(
            online_payload(vec![
                QuestionCreate::yes_no("Q1", "Yes", 3_000_000_000),
                QuestionCreate::yes_no("Q2", "No", 3_000_000_000),
            ]),
            Settings::default().limits(),
            datetime!(2025-02-01 00:00 UTC),
        )
        .unwrap_err();
        assert!(matches!(err, TestFlowError::Validation(message) if message.contains("overflow")));
    }

    #[test]
    fn window_must_end_within_the_calendar() {
        let limits = Settings::default().limits().clone();
        let created = datetime!(2025-02-01 00:00 UTC);

        let mut payload = online_payload(vec![QuestionCreate::yes_no("Q1", "Yes", 1)]);
        payload.duration_minutes = i64::from(u32::MAX);
        let err = build_online_test(payload.clone(), &limits, created).unwrap_err();
        assert!(matches!(err, TestFlowError::Validation(message) if message.contains("duration_minutes")));

        payload.start_at = datetime!(9999-12-31 23:00 UTC);
        payload.duration_minutes = 59;
        assert!(build_online_test(payload.clone(), &limits, created).is_ok());
        payload.duration_minutes = 60;
        assert!(build_online_test(payload, &limits, created).is_err());

        let offline = OfflineTestCreate {
            title: "Lab".to_string(),
            batch_id: "batch-1".to_string(),
            start_at: datetime!(2025-03-01 09:00 UTC),
            duration_minutes: i64::from(u32::MAX),
            total_marks: 10,
            assignment_target: AssignmentTarget::All,
            assigned_student_ids: Vec::new(),
        };
        assert!(build_offline_test(offline, &limits, created).is_err());

        let mut draft = TestDraft::new("Draft", "batch-1", datetime!(2025-03-01 09:00 UTC), u32::MAX);
        draft.add_question(QuestionCreate::yes_no("Q1", "Yes", 1)).unwrap();
        assert!(draft.into_test(&limits, created).is_err());
    }

    #[tokio::test]
    async fn rejected_window_is_never_stored() {
        let ctx = test_support::setup_test_context().await;
        let mut payload = online_payload(vec![QuestionCreate::yes_no("Q1", "Yes", 1)]);
        payload.duration_minutes = i64::from(u32::MAX);

        assert!(create_online_test(&ctx.state, payload).await.is_err());
        assert!(list_tests_for_batch(&ctx.state, "batch-1").await.unwrap().is_empty());
    }

    #[test]
    fn failed_draft_edit_leaves_question_untouched() {
        let mut draft = TestDraft::new("Draft", "batch-1", datetime!(2025-03-01 09:00 UTC), 20);
        draft.add_question(QuestionCreate::yes_no("Q1", "Yes", 3)).unwrap();

        assert!(draft.update_question(0, QuestionCreate::yes_no("Q1", "Maybe", 3)).is_err());
        assert_eq!(draft.questions()[0].correct_answer, "Yes");
        assert_eq!(draft.total_marks(), 3);
    }

    #[tokio::test]
    async fn published_draft_is_listed_newest_first() {
        let ctx = test_support::setup_test_context().await;

        let mut older = TestDraft::new("Older", "batch-1", datetime!(2025-03-01 09:00 UTC), 20);
        older.add_question(QuestionCreate::yes_no("Q1", "Yes", 3)).unwrap();
        let older = older.publish(&ctx.state).await.unwrap();

        let newer = TestDraft::with_default_duration(
            ctx.state.settings(),
            "Newer",
            "batch-1",
            datetime!(2025-03-08 09:00 UTC),
        );
        let newer = newer.publish(&ctx.state).await.unwrap();
        assert_eq!(newer.duration_minutes, 60);
        assert_eq!(newer.total_marks, 0);

        let listed = list_tests_for_batch(&ctx.state, "batch-1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|test| test.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
        assert!(list_tests_for_batch(&ctx.state, "batch-2").await.unwrap().is_empty());

        let fetched = fetch_test(&ctx.state, &older.id).await.unwrap();
        assert_eq!(fetched.total_marks, 3);
        assert!(fetch_test(&ctx.state, "missing").await.unwrap_err().is_not_found());
    }
}
