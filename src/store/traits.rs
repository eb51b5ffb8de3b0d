// Persistence collaborator interface

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::EntityKind;
use crate::model::{Project, ProjectFilter, ProjectId, Quote, QuoteFilter, QuoteId};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write found a different current value than expected
    #[error("{entity} {id} changed concurrently (expected {expected}, found {found})")]
    Conflict {
        entity: EntityKind,
        id: String,
        expected: String,
        found: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Store is corrupt: {reason}")]
    Corrupt { reason: String },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Precondition on the stored value a write replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// No record with this id may exist yet
    Absent,
    /// The stored record must still be at this version
    Version(u64),
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Absent => f.write_str("absent"),
            Expected::Version(v) => write!(f, "version {v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Quote(Quote),
    Project(Project),
}

impl Record {
    pub fn entity(&self) -> EntityKind {
        match self {
            Record::Quote(_) => EntityKind::Quote,
            Record::Project(_) => EntityKind::Project,
        }
    }

    pub fn id(&self) -> String {
        match self {
            Record::Quote(q) => q.id.to_string(),
            Record::Project(p) => p.id.to_string(),
        }
    }
}

/// One compare-and-swap: replace the record only if `expected` still holds
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalWrite {
    pub record: Record,
    pub expected: Expected,
}

impl ConditionalWrite {
    pub fn insert_quote(quote: Quote) -> Self {
        Self {
            record: Record::Quote(quote),
            expected: Expected::Absent,
        }
    }

    pub fn update_quote(quote: Quote, expected_version: u64) -> Self {
        Self {
            record: Record::Quote(quote),
            expected: Expected::Version(expected_version),
        }
    }

    pub fn insert_project(project: Project) -> Self {
        Self {
            record: Record::Project(project),
            expected: Expected::Absent,
        }
    }

    pub fn update_project(project: Project, expected_version: u64) -> Self {
        Self {
            record: Record::Project(project),
            expected: Expected::Version(expected_version),
        }
    }
}

/// Durable state lives entirely behind this trait.
///
/// `apply` is the single atomic primitive: either every write's precondition
/// holds and all of them commit, or nothing changes and a
/// [`StoreError::Conflict`] names the first mismatch.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, StoreError>;

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, StoreError>;

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError>;

    async fn apply(&self, writes: Vec<ConditionalWrite>) -> Result<(), StoreError>;
}
