// Workflow engine - quote and project managers, claim arbitration, promotion.
// Stateless between calls: every operation reads, validates and commits
// through the store's conditional write, then notifies.

pub mod projects;
pub mod promotion;
pub mod quotes;

pub use projects::ProjectManager;
pub use promotion::{Promotion, PromotionCoordinator};
pub use quotes::QuoteManager;

use std::sync::Arc;

use crate::catalog::EntityKind;
use crate::config::EngineConfig;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::model::{Project, ProjectId, Quote, QuoteId};
use crate::notify::{NotificationSink, Notifier};
use crate::observability::WorkflowMetrics;
use crate::policy::{Action, Actor, ActorRole};
use crate::store::{StoreError, WorkflowStore};

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub max_write_retries: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_write_retries: config.max_write_retries.max(1),
        }
    }
}

/// Collaborators shared by every manager
#[derive(Clone)]
pub(crate) struct EngineContext {
    pub store: Arc<dyn WorkflowStore>,
    pub notifier: Notifier,
    pub metrics: Arc<WorkflowMetrics>,
    pub settings: EngineSettings,
}

impl EngineContext {
    pub async fn load_quote(&self, id: QuoteId) -> WorkflowResult<Quote> {
        self.store
            .get_quote(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(EntityKind::Quote, id))
    }

    pub async fn load_project(&self, id: ProjectId) -> WorkflowResult<Project> {
        self.store
            .get_project(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(EntityKind::Project, id))
    }

    /// Whether a failed conditional write should be retried after re-reading
    pub fn should_retry(&self, err: &StoreError, attempt: u32) -> bool {
        if !err.is_conflict() {
            return false;
        }
        self.metrics.record_write_conflict();
        attempt < self.settings.max_write_retries
    }
}

/// Customers may only touch records they own
pub(crate) fn ensure_owner(
    actor: &Actor,
    owner: &crate::model::ActorId,
    action: Action,
) -> WorkflowResult<()> {
    if actor.role == ActorRole::Customer && &actor.id != owner {
        return Err(WorkflowError::Authorization {
            actor: actor.id.clone(),
            role: actor.role,
            action,
        });
    }
    Ok(())
}

pub(crate) fn require_text(field: &'static str, value: &str) -> WorkflowResult<()> {
    if value.trim().is_empty() {
        return Err(WorkflowError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Entry point bundling the managers around one store and one sink
pub struct WorkflowEngine {
    quotes: QuoteManager,
    projects: ProjectManager,
    promotions: PromotionCoordinator,
    metrics: Arc<WorkflowMetrics>,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        sink: Arc<dyn NotificationSink>,
        settings: EngineSettings,
    ) -> Self {
        let metrics = Arc::new(WorkflowMetrics::new());
        let ctx = EngineContext {
            store,
            notifier: Notifier::new(sink, metrics.clone()),
            metrics: metrics.clone(),
            settings,
        };

        Self {
            quotes: QuoteManager::new(ctx.clone()),
            projects: ProjectManager::new(ctx.clone()),
            promotions: PromotionCoordinator::new(ctx),
            metrics,
        }
    }

    pub fn quotes(&self) -> &QuoteManager {
        &self.quotes
    }

    pub fn projects(&self) -> &ProjectManager {
        &self.projects
    }

    pub fn promotions(&self) -> &PromotionCoordinator {
        &self.promotions
    }

    pub fn metrics(&self) -> &WorkflowMetrics {
        &self.metrics
    }
}
