use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreError;
use crate::models::OfflineMark;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkUpsert {
    Inserted(OfflineMark),
    Updated(OfflineMark),
}

impl MarkUpsert {
    pub fn into_mark(self) -> OfflineMark {
        match self {
            Self::Inserted(mark) | Self::Updated(mark) => mark,
        }
    }
}

#[async_trait]
pub trait MarkStore: Send + Sync {
    /// Replaces marks and feedback of the existing (test, student) record, keeping its id and
    /// `recorded_at`, or inserts `mark` as given.
    async fn upsert(&self, mark: OfflineMark) -> Result<MarkUpsert, StoreError>;

    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<OfflineMark>, StoreError>;

    async fn list_by_test(&self, test_id: &str) -> Result<Vec<OfflineMark>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryMarkStore {
    marks: RwLock<HashMap<(String, String), OfflineMark>>,
}

#[async_trait]
impl MarkStore for InMemoryMarkStore {
    async fn upsert(&self, mark: OfflineMark) -> Result<MarkUpsert, StoreError> {
        let key = (mark.test_id.clone(), mark.student_id.clone());
        let mut marks = self.marks.write().await;
        match marks.get_mut(&key) {
            Some(existing) => {
                existing.marks = mark.marks;
                existing.feedback = mark.feedback;
                existing.updated_at = mark.updated_at;
                Ok(MarkUpsert::Updated(existing.clone()))
            }
            None => {
                marks.insert(key, mark.clone());
                Ok(MarkUpsert::Inserted(mark))
            }
        }
    }

    async fn find_by_test_and_student(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<OfflineMark>, StoreError> {
        let key = (test_id.to_string(), student_id.to_string());
        Ok(self.marks.read().await.get(&key).cloned())
    }

    async fn list_by_test(&self, test_id: &str) -> Result<Vec<OfflineMark>, StoreError> {
        let mut items: Vec<OfflineMark> = self
            .marks
            .read()
            .await
            .values()
            .filter(|mark| mark.test_id == test_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        Ok(items)
    }
}
