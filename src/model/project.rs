use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ActorId, ProjectId, QuoteId};
use super::money::{Money, Rating};
use super::quote::Quote;
use crate::catalog::ProjectStatus;

/// An accepted unit of work, tracked from claim through completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub quote_id: Option<QuoteId>,
    pub customer: ActorId,
    /// `None` exactly while the project is pending (or was cancelled before a claim)
    pub assigned_technician: Option<ActorId>,
    pub service: String,
    pub location: String,
    pub notes: String,
    pub technician_notes: Option<String>,
    pub status: ProjectStatus,
    pub final_price: Option<Money>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<Rating>,
    pub review: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a directly created project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub quote_id: Option<QuoteId>,
    pub customer: ActorId,
    pub service: String,
    pub location: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// Staff-side field edits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectAmendment {
    pub final_price: Option<Money>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub technician_notes: Option<String>,
}

impl ProjectAmendment {
    pub fn is_empty(&self) -> bool {
        self.final_price.is_none()
            && self.scheduled_date.is_none()
            && self.technician_notes.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub customer: Option<ActorId>,
    pub technician: Option<ActorId>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.status.map_or(true, |status| project.status == status)
            && self.customer.as_ref().map_or(true, |customer| &project.customer == customer)
            && self
                .technician
                .as_ref()
                .map_or(true, |tech| project.assigned_technician.as_ref() == Some(tech))
    }

    /// Projects any staff member may still claim
    pub fn claimable() -> Self {
        Self {
            status: Some(ProjectStatus::Pending),
            ..Default::default()
        }
    }
}

impl Project {
    pub fn new(draft: ProjectDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: ProjectId::new(),
            quote_id: draft.quote_id,
            customer: draft.customer,
            assigned_technician: None,
            service: draft.service,
            location: draft.location,
            notes: draft.notes,
            technician_notes: None,
            status: ProjectStatus::Pending,
            final_price: None,
            scheduled_date: draft.scheduled_date,
            started_at: None,
            completed_at: None,
            rating: None,
            review: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Project inheriting service, location and notes from an approved quote
    pub fn from_quote(quote: &Quote, now: DateTime<Utc>) -> Self {
        Self::new(
            ProjectDraft {
                quote_id: Some(quote.id),
                customer: quote.requester.clone(),
                service: quote.service.clone(),
                location: quote.location.clone(),
                notes: quote.notes.clone(),
                scheduled_date: None,
            },
            now,
        )
    }

    pub fn is_claimable(&self) -> bool {
        self.status == ProjectStatus::Pending && self.assigned_technician.is_none()
    }

    pub fn is_bound_to(&self, actor: &ActorId) -> bool {
        self.assigned_technician.as_ref() == Some(actor)
    }

    pub(crate) fn next_version(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = now;
        next
    }

    /// Next version with the status moved and lifecycle timestamps stamped
    pub(crate) fn with_status(&self, status: ProjectStatus, now: DateTime<Utc>) -> Self {
        let mut next = self.next_version(now);
        next.status = status;
        match status {
            ProjectStatus::InProgress => next.started_at = Some(now),
            ProjectStatus::Completed => next.completed_at = Some(now),
            _ => {}
        }
        next
    }

    pub(crate) fn claimed_by(&self, technician: ActorId, now: DateTime<Utc>) -> Self {
        let mut next = self.with_status(ProjectStatus::Starting, now);
        next.assigned_technician = Some(technician);
        next
    }
}
