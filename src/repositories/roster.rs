use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreError;

/// Directory of the students enrolled in each batch.
#[async_trait]
pub trait Roster: Send + Sync {
    async fn list_students_in_batch(&self, batch_id: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRoster {
    batches: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryRoster {
    pub async fn enroll(&self, batch_id: &str, student_id: &str) {
        let mut batches = self.batches.write().await;
        let students = batches.entry(batch_id.to_string()).or_default();
        if !students.iter().any(|existing| existing == student_id) {
            students.push(student_id.to_string());
        }
    }
}

#[async_trait]
impl Roster for InMemoryRoster {
    async fn list_students_in_batch(&self, batch_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.batches.read().await.get(batch_id).cloned().unwrap_or_default())
    }
}
