use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::StoreError;
use crate::models::Test;

#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Fails with `Duplicate` when the id is already taken.
    async fn insert(&self, test: Test) -> Result<(), StoreError>;

    async fn find_by_id(&self, test_id: &str) -> Result<Option<Test>, StoreError>;

    async fn list_by_batch(&self, batch_id: &str) -> Result<Vec<Test>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTestRepository {
    tests: RwLock<HashMap<String, Test>>,
}

#[async_trait]
impl TestRepository for InMemoryTestRepository {
    async fn insert(&self, test: Test) -> Result<(), StoreError> {
        let mut tests = self.tests.write().await;
        if tests.contains_key(&test.id) {
            return Err(StoreError::Duplicate(test.id));
        }
        tests.insert(test.id.clone(), test);
        Ok(())
    }

    async fn find_by_id(&self, test_id: &str) -> Result<Option<Test>, StoreError> {
        Ok(self.tests.read().await.get(test_id).cloned())
    }

    async fn list_by_batch(&self, batch_id: &str) -> Result<Vec<Test>, StoreError> {
        let mut tests: Vec<Test> = self
            .tests
            .read()
            .await
            .values()
            .filter(|test| test.batch_id == batch_id)
            .cloned()
            .collect();
        tests.sort_by(|a, b| b.start_at.cmp(&a.start_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tests)
    }
}
