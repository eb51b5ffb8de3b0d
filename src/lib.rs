// Fieldflow Library - quote/project workflow engine
// This exposes the core components for client surfaces and integration tests

pub mod board;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod notify;
pub mod observability;
pub mod policy;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use board::{BoardChange, ProjectBoard};
pub use catalog::{catalog, transition_allowed, EntityKind, Lifecycle, ProjectStatus, QuoteStatus};
pub use config::FieldflowConfig;
pub use engine::{
    EngineSettings, ProjectManager, Promotion, PromotionCoordinator, QuoteManager, WorkflowEngine,
};
pub use errors::{ErrorKind, WorkflowError, WorkflowResult};
pub use model::{
    ActorId, Money, Project, ProjectAmendment, ProjectDraft, ProjectFilter, ProjectId, Quote,
    QuoteDraft, QuoteFilter, QuoteId, QuoteUpdate, Rating,
};
pub use notify::{NotificationSink, Notifier, WorkflowEvent};
pub use observability::{OperationTimer, WorkflowMetrics, WorkflowStats};
pub use policy::{authorize, effective_role, Action, Actor, ActorRole, IdentityClaims};
pub use store::{open_store, ConditionalWrite, Expected, StoreError, WorkflowStore};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
