// Typed workflow failures. Every error is scoped to one call and never retried by the engine.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::EntityKind;
use crate::model::{ActorId, ProjectId};
use crate::policy::{Action, ActorRole};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Requested status is unreachable from the current one (stale client or logic bug)
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: EntityKind,
        from: &'static str,
        to: &'static str,
    },

    /// The actor's role, ownership or technician binding does not allow the action
    #[error("{role} '{actor}' is not allowed to {action}")]
    Authorization {
        actor: ActorId,
        role: ActorRole,
        action: Action,
    },

    /// Lost the race to accept a pending project; refresh and drop it locally
    #[error("project {project_id} is no longer open for claiming")]
    ClaimConflict {
        project_id: ProjectId,
        holder: Option<ActorId>,
    },

    #[error("{field} must be set before {operation}")]
    FieldRequired {
        field: &'static str,
        operation: &'static str,
    },

    #[error("{field} has already been set and cannot be written again")]
    OneTimeField { field: &'static str },

    #[error("cannot {operation} {entity} {id} while it is {status}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        status: &'static str,
        operation: &'static str,
    },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Stable error codes shared by every client surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidTransition,
    Authorization,
    ClaimConflict,
    FieldRequired,
    OneTimeField,
    InvalidState,
    InvalidField,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Authorization => "authorization",
            ErrorKind::ClaimConflict => "claim_conflict",
            ErrorKind::FieldRequired => "field_required",
            ErrorKind::OneTimeField => "one_time_field",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidField => "invalid_field",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
        }
    }
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            WorkflowError::Authorization { .. } => ErrorKind::Authorization,
            WorkflowError::ClaimConflict { .. } => ErrorKind::ClaimConflict,
            WorkflowError::FieldRequired { .. } => ErrorKind::FieldRequired,
            WorkflowError::OneTimeField { .. } => ErrorKind::OneTimeField,
            WorkflowError::InvalidState { .. } => ErrorKind::InvalidState,
            WorkflowError::InvalidField { .. } => ErrorKind::InvalidField,
            WorkflowError::NotFound { .. } => ErrorKind::NotFound,
            WorkflowError::Store(_) => ErrorKind::Storage,
        }
    }

    /// Whether the failure is a permissions problem rather than a workflow one
    pub fn is_authorization(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
