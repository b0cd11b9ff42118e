use std::collections::BTreeMap;

use uuid::Uuid;
use validator::Validate;

use crate::core::state::AppState;
use crate::errors::TestFlowError;
use crate::models::types::TestMode;
use crate::models::{OfflineMark, Test};
use crate::repositories::MarkUpsert;
use crate::schemas::result::{QuestionScore, ScoreSheet};
use crate::schemas::OfflineMarkCreate;
use crate::services::question_bank::check_answer;
use crate::services::results::test_roster;

/// Scores an answer map against the test's answer key. Unanswered questions score zero.
pub fn score_online_attempt(test: &Test, answers: &BTreeMap<String, String>) -> ScoreSheet {
    let breakdown: Vec<QuestionScore> = test
        .questions
        .iter()
        .map(|question| {
            let is_correct = answers
                .get(&question.id)
                .is_some_and(|given| check_answer(question, given));
            QuestionScore {
                question_id: question.id.clone(),
                awarded: if is_correct { question.marks } else { 0 },
                max: question.marks,
                is_correct,
            }
        })
        .collect();

    let score = breakdown.iter().map(|item| item.awarded).sum();
    ScoreSheet { score, total_marks: test.total_marks, breakdown }
}

/// Records or replaces the grader's mark for one student on an offline test.
pub async fn record_offline_mark(
    state: &AppState,
    test_id: &str,
    student_id: &str,
    payload: OfflineMarkCreate,
) -> Result<OfflineMark, TestFlowError> {
    payload.validate()?;

    let test = crate::services::test_definitions::fetch_test(state, test_id).await?;
    if test.mode != TestMode::Offline {
        return Err(TestFlowError::Validation(
            "marks can only be recorded for offline tests".to_string(),
        ));
    }

    let marks = u32::try_from(payload.marks)
        .ok()
        .filter(|marks| *marks <= test.total_marks)
        .ok_or_else(|| {
            TestFlowError::Validation(format!("marks must be between 0 and {}", test.total_marks))
        })?;

    let now = state.now();
    if now < test.start_at {
        return Err(TestFlowError::Validation(
            "marks cannot be recorded before the test starts".to_string(),
        ));
    }

    let roster = test_roster(state, &test).await?;
    if !roster.iter().any(|id| id == student_id) {
        return Err(TestFlowError::NotFound("Student is not on the test roster".to_string()));
    }

    let feedback = payload
        .feedback
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let outcome = state
        .marks()
        .upsert(OfflineMark {
            id: Uuid::new_v4().to_string(),
            test_id: test.id.clone(),
            student_id: student_id.to_string(),
            marks,
            feedback,
            recorded_at: now,
            updated_at: now,
        })
        .await
        .map_err(|e| TestFlowError::internal(e, "Failed to store mark"))?;

    let op = match outcome {
        MarkUpsert::Inserted(_) => "insert",
        MarkUpsert::Updated(_) => "update",
    };
    metrics::counter!("offline_marks_total", "op" => op).increment(1);

    let mark = outcome.into_mark();
    tracing::info!(
        test_id = %mark.test_id,
        student_id = %mark.student_id,
        marks = mark.marks,
        total_marks = test.total_marks,
        op,
        "Offline mark recorded"
    );
    Ok(mark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::QuestionCreate;
    use crate::test_support;
    use time::Duration;

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(id, answer)| (id.to_string(), answer.to_string())).collect()
    }

    #[test]
    fn mcq_right_and_yes_no_wrong_scores_mcq_marks() {
        let test = test_support::sample_online_test();
        let (q1, q2) = (test.questions[0].id.clone(), test.questions[1].id.clone());

        let sheet = score_online_attempt(&test, &answers(&[(&q1, "B"), (&q2, "No")]));
        assert_eq!(sheet.score, 5);
        assert_eq!(sheet.total_marks, 7);
        assert!(sheet.breakdown[0].is_correct);
        assert!(!sheet.breakdown[1].is_correct);
        assert_eq!(sheet.breakdown[1].awarded, 0);
    }

    #[test]
    fn empty_answers_score_zero() {
        let test = test_support::sample_online_test();
        let sheet = score_online_attempt(&test, &BTreeMap::new());
        assert_eq!(sheet.score, 0);
        assert_eq!(sheet.breakdown.len(), 2);
    }

    #[test]
    fn scoring_is_exact_match_and_bounded() {
        let test = test_support::online_test_with(vec![
            QuestionCreate::fill_in_blanks("Capital of France", "Paris", 4),
            QuestionCreate::yes_no("Is water wet?", "Yes", 1),
        ]);
        let (q1, q2) = (test.questions[0].id.clone(), test.questions[1].id.clone());

        for (given1, given2) in [("paris", "yes"), (" Paris", "Yes "), ("Paris", "Yes"), ("", "")] {
            let sheet = score_online_attempt(&test, &answers(&[(&q1, given1), (&q2, given2)]));
            assert!(sheet.score <= test.total_marks);
            assert_eq!(sheet, score_online_attempt(&test, &answers(&[(&q1, given1), (&q2, given2)])));
        }

        let sheet = score_online_attempt(&test, &answers(&[(&q1, "Paris"), (&q2, "Yes")]));
        assert_eq!(sheet.score, 5);
        let sheet = score_online_attempt(&test, &answers(&[(&q1, "paris"), (&q2, "Yes ")]));
        assert_eq!(sheet.score, 0);
    }

    #[test]
    fn answers_for_unknown_questions_are_ignored() {
        let test = test_support::sample_online_test();
        let sheet = score_online_attempt(&test, &answers(&[("not-a-question", "B")]));
        assert_eq!(sheet.score, 0);
    }

    #[tokio::test]
    async fn second_mark_replaces_the_first() {
        let ctx = test_support::setup_test_context().await;
        let test = ctx.seed_offline_test(100).await;
        ctx.clock.set(test.start_at + Duration::hours(1));

        let first = record_offline_mark(
            &ctx.state,
            &test.id,
            "s1",
            OfflineMarkCreate { marks: 85, feedback: None },
        )
        .await
        .unwrap();
        let second = record_offline_mark(
            &ctx.state,
            &test.id,
            "s1",
            OfflineMarkCreate { marks: 90, feedback: Some("Good work".to_string()) },
        )
        .await
        .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.marks, 90);
        let marks = ctx.state.marks().list_by_test(&test.id).await.unwrap();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].marks, 90);
        assert_eq!(marks[0].feedback.as_deref(), Some("Good work"));
    }

    #[tokio::test]
    async fn out_of_range_mark_is_rejected_without_writing() {
        let ctx = test_support::setup_test_context().await;
        let test = ctx.seed_offline_test(100).await;
        ctx.clock.set(test.start_at + Duration::hours(1));

        for marks in [101, -1] {
            let err = record_offline_mark(
                &ctx.state,
                &test.id,
                "s1",
                OfflineMarkCreate { marks, feedback: None },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, TestFlowError::Validation(_)));
        }

        let boundary = record_offline_mark(
            &ctx.state,
            &test.id,
            "s2",
            OfflineMarkCreate { marks: 100, feedback: None },
        )
        .await
        .unwrap();
        assert_eq!(boundary.marks, 100);
        assert!(ctx.state.marks().find_by_test_and_student(&test.id, "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_guards_mode_start_and_roster() {
        let ctx = test_support::setup_test_context().await;
        let offline = ctx.seed_offline_test(50).await;
        let online = ctx.seed_online_test().await;

        ctx.clock.set(offline.start_at - Duration::minutes(5));
        let err = record_offline_mark(&ctx.state, &offline.id, "s1", OfflineMarkCreate { marks: 10, feedback: None })
            .await
            .unwrap_err();
        assert!(matches!(err, TestFlowError::Validation(_)));

        ctx.clock.set(offline.start_at + Duration::minutes(5));
        let err = record_offline_mark(&ctx.state, &offline.id, "stranger", OfflineMarkCreate { marks: 10, feedback: None })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = record_offline_mark(&ctx.state, &online.id, "s1", OfflineMarkCreate { marks: 1, feedback: None })
            .await
            .unwrap_err();
        assert!(matches!(err, TestFlowError::Validation(_)));

        let err = record_offline_mark(&ctx.state, "missing", "s1", OfflineMarkCreate { marks: 1, feedback: None })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
