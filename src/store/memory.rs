use async_trait::async_trait;
use tokio::sync::RwLock;

use super::tables::Tables;
use super::traits::{ConditionalWrite, StoreError, WorkflowStore};
use crate::model::{Project, ProjectFilter, ProjectId, Quote, QuoteFilter, QuoteId};

/// Process-local store; one write lock makes each `apply` indivisible
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, StoreError> {
        Ok(self.tables.read().await.get_quote(id))
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, StoreError> {
        Ok(self.tables.read().await.list_quotes(filter))
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.tables.read().await.get_project(id))
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        Ok(self.tables.read().await.list_projects(filter))
    }

    async fn apply(&self, writes: Vec<ConditionalWrite>) -> Result<(), StoreError> {
        self.tables.write().await.apply(writes)
    }
}
