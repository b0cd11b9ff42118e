use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreError;
use crate::models::OnlineTestSubmission;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(OnlineTestSubmission),
    /// A submission already existed for the (test, student) pair; it is returned untouched.
    Existing(OnlineTestSubmission),
}

impl CreateOutcome {
    pub fn into_submission(self) -> OnlineTestSubmission {
        match self {
            Self::Created(submission) | Self::Existing(submission) => submission,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Inserts unless a submission for the same (test, student) pair exists.
    async fn create_if_absent(
        &self,
        submission: OnlineTestSubmission,
    ) -> Result<CreateOutcome, StoreError>;

    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<OnlineTestSubmission>, StoreError>;

    /// Oldest submission first.
    async fn list_by_test(&self, test_id: &str) -> Result<Vec<OnlineTestSubmission>, StoreError>;

    async fn list_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<OnlineTestSubmission>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    submissions: RwLock<HashMap<(String, String), OnlineTestSubmission>>,
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn create_if_absent(
        &self,
        submission: OnlineTestSubmission,
    ) -> Result<CreateOutcome, StoreError> {
        let key = (submission.test_id.clone(), submission.student_id.clone());
        let mut submissions = self.submissions.write().await;
        if let Some(existing) = submissions.get(&key) {
            return Ok(CreateOutcome::Existing(existing.clone()));
        }
        submissions.insert(key, submission.clone());
        Ok(CreateOutcome::Created(submission))
    }

    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<OnlineTestSubmission>, StoreError> {
        let key = (test_id.to_string(), student_id.to_string());
        Ok(self.submissions.read().await.get(&key).cloned())
    }

    async fn list_by_test(&self, test_id: &str) -> Result<Vec<OnlineTestSubmission>, StoreError> {
        let mut items: Vec<OnlineTestSubmission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|submission| submission.test_id == test_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn list_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<OnlineTestSubmission>, StoreError> {
        let mut items: Vec<OnlineTestSubmission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|submission| submission.student_id == student_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }
}
