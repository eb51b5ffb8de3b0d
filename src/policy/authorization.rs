// Authorization dispatch table: (role, action) -> permitted

use serde::{Deserialize, Serialize};
use std::fmt;

use super::role::{Actor, ActorRole};
use crate::catalog::{EntityKind, ProjectStatus, QuoteStatus};
use crate::errors::WorkflowError;

/// Every guarded operation the engine performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewQuote,
    CreateQuote,
    ApproveQuote,
    RejectQuote,
    /// Price and staff-note edits that leave the status alone
    AmendQuote,
    PromoteQuote,
    ViewProject,
    CreateProject,
    ClaimProject,
    AdvanceProject,
    CancelProject,
    AmendProject,
    RateProject,
}

impl Action {
    pub fn entity(self) -> EntityKind {
        match self {
            Action::ViewQuote
            | Action::CreateQuote
            | Action::ApproveQuote
            | Action::RejectQuote
            | Action::AmendQuote
            | Action::PromoteQuote => EntityKind::Quote,
            _ => EntityKind::Project,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::ViewQuote => "view a quote",
            Action::CreateQuote => "create a quote",
            Action::ApproveQuote => "approve a quote",
            Action::RejectQuote => "reject a quote",
            Action::AmendQuote => "amend a quote",
            Action::PromoteQuote => "promote a quote",
            Action::ViewProject => "view a project",
            Action::CreateProject => "create a project",
            Action::ClaimProject => "claim a project",
            Action::AdvanceProject => "advance a project",
            Action::CancelProject => "cancel a project",
            Action::AmendProject => "amend a project",
            Action::RateProject => "rate a project",
        }
    }

    /// Action that moves a quote into `status`, if one exists
    pub fn for_quote_status(status: QuoteStatus) -> Option<Action> {
        match status {
            QuoteStatus::Approved => Some(Action::ApproveQuote),
            QuoteStatus::Rejected => Some(Action::RejectQuote),
            QuoteStatus::Pending => None,
        }
    }

    pub fn for_project_status(status: ProjectStatus) -> Action {
        match status {
            ProjectStatus::Starting => Action::ClaimProject,
            ProjectStatus::Cancelled => Action::CancelProject,
            _ => Action::AdvanceProject,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure role policy. Record-level checks (ownership, technician binding)
/// are layered on top by the managers.
pub fn permits(role: ActorRole, action: Action) -> bool {
    use ActorRole::*;

    match action {
        // Customers are further limited to their own records
        Action::ViewQuote | Action::ViewProject => true,
        Action::CreateQuote | Action::PromoteQuote | Action::RateProject => role == Customer,
        Action::ApproveQuote | Action::RejectQuote | Action::AmendQuote | Action::CreateProject => {
            matches!(role, Support | Admin)
        }
        Action::ClaimProject
        | Action::AdvanceProject
        | Action::CancelProject
        | Action::AmendProject => matches!(role, Staff | Support | Admin),
    }
}

pub fn authorize(actor: &Actor, action: Action) -> Result<(), WorkflowError> {
    if permits(actor.role, action) {
        Ok(())
    } else {
        Err(WorkflowError::Authorization {
            actor: actor.id.clone(),
            role: actor.role,
            action,
        })
    }
}
