use std::sync::Arc;

use serde_json::json;
use time::macros::datetime;
use time::Duration;

use testflow::models::types::{FinalizeMode, TestStatus};
use testflow::repositories::{InMemoryRoster, Stores};
use testflow::schemas::result::TestAction;
use testflow::schemas::{OfflineMarkCreate, OfflineTestCreate, QuestionCreate};
use testflow::services::test_definitions::{create_offline_test, TestDraft};
use testflow::services::{results, scoring};
use testflow::{open_attempt, AppState, AttemptStage, ManualClock, Settings};

async fn state_with_batch(clock: Arc<ManualClock>) -> AppState {
    let roster = Arc::new(InMemoryRoster::default());
    for student in ["amira", "ben", "chen"] {
        roster.enroll("bio-101", student).await;
    }
    AppState::new(Settings::default(), clock, Stores::in_memory(roster))
}

#[tokio::test(start_paused = true)]
async fn online_test_from_draft_to_result() {
    let clock = Arc::new(ManualClock::new(datetime!(2025-04-10 08:00 UTC)));
    let state = state_with_batch(clock.clone()).await;

    let mut draft = TestDraft::new("Cells", "bio-101", datetime!(2025-04-10 09:00 UTC), 1);
    draft
        .add_question(QuestionCreate::mcq("Powerhouse of the cell?", &["Nucleus", "Mitochondria"], "Mitochondria", 3))
        .unwrap();
    draft.add_question(QuestionCreate::fill_in_blanks("Unit of life", "cell", 2)).unwrap();
    draft.add_question(QuestionCreate::yes_no("Do plant cells have walls?", "Yes", 1)).unwrap();
    draft.remove_question(2).unwrap();
    assert_eq!(draft.total_marks(), 5);
    let test = draft.publish(&state).await.unwrap();
    assert_eq!(test.total_marks, 5);

    let refused = open_attempt(&state, &test.id, "amira").await;
    assert!(refused.is_err());

    clock.set(datetime!(2025-04-10 09:00:30 UTC));
    let session = open_attempt(&state, &test.id, "amira").await.unwrap();
    assert_eq!(session.instructions().await.total_questions, 2);

    session.start().await.unwrap();
    session.answer("Mitochondria").await.unwrap();
    session.next().await.unwrap();
    session.answer("Cell").await.unwrap();
    let summary = session.request_review().await.unwrap();
    assert_eq!(summary.answered_count, 2);

    let submission = session.submit().await.unwrap();
    assert_eq!(submission.score, 3);
    assert_eq!(submission.finalized_by, FinalizeMode::ManualSubmit);
    assert!(matches!(session.stage().await, AttemptStage::Result { .. }));

    let detail = results::fetch_online_result(&state, &test.id, "amira").await.unwrap();
    assert_eq!(detail.breakdown[1].given_answer.as_deref(), Some("Cell"));
    assert!(!detail.breakdown[1].is_correct);

    let overview = results::student_overview(&state, "bio-101", "amira").await.unwrap();
    assert_eq!(overview[0].status, TestStatus::Submitted);
    assert_eq!(overview[0].actions, vec![TestAction::ViewResult]);

    // ben never opens the test; chen lets the timer run out.
    let chen = open_attempt(&state, &test.id, "chen").await.unwrap();
    chen.start().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    let auto = chen.submission().await.expect("auto-submitted");
    assert_eq!(auto.finalized_by, FinalizeMode::AutoDeadline);

    let roster = results::submission_roster(&state, &test.id).await.unwrap();
    assert_eq!(roster.submitted_count, 2);
    assert_eq!(roster.missing_student_ids, vec!["ben".to_string()]);

    clock.set(test.end_at() + Duration::minutes(1));
    let overview = results::student_overview(&state, "bio-101", "ben").await.unwrap();
    assert_eq!(overview[0].status, TestStatus::Missed);
    assert!(overview[0].actions.is_empty());
}

#[tokio::test]
async fn offline_test_marks_are_upserted() {
    let clock = Arc::new(ManualClock::new(datetime!(2025-04-10 08:00 UTC)));
    let state = state_with_batch(clock.clone()).await;

    let payload: OfflineTestCreate = serde_json::from_value(json!({
        "title": "Dissection practical",
        "batchId": "bio-101",
        "date": "2025-04-11T10:00",
        "durationMinutes": 120,
        "totalMarks": 100
    }))
    .unwrap();
    let test = create_offline_test(&state, payload).await.unwrap();
    assert_eq!(test.start_at, datetime!(2025-04-11 10:00 UTC));
    assert_eq!(test.number_of_questions(), None);

    clock.set(datetime!(2025-04-11 13:00 UTC));
    scoring::record_offline_mark(&state, &test.id, "ben", OfflineMarkCreate { marks: 85, feedback: None })
        .await
        .unwrap();
    let mark = scoring::record_offline_mark(
        &state,
        &test.id,
        "ben",
        OfflineMarkCreate { marks: 90, feedback: Some("Neat work".to_string()) },
    )
    .await
    .unwrap();
    assert_eq!(mark.marks, 90);

    let rows = results::offline_marking_roster(&state, &test.id).await.unwrap();
    let marked: Vec<_> = rows.iter().filter(|row| row.mark.is_some()).collect();
    assert_eq!(marked.len(), 1);
    assert_eq!(marked[0].student_id, "ben");

    let detail = results::fetch_offline_result(&state, &test.id, "ben").await.unwrap();
    assert_eq!(detail.marks, 90);
    assert_eq!(detail.total_marks, 100);

    let overview = results::student_overview(&state, "bio-101", "ben").await.unwrap();
    assert_eq!(overview[0].status, TestStatus::Marked);
    assert_eq!(overview[0].actions, vec![TestAction::ViewMarks]);
}
