use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::ids::{ActorId, ProjectId, QuoteId};
use super::money::Money;
use crate::catalog::QuoteStatus;

/// A priced estimate request awaiting a support/admin decision.
///
/// Serializes with a derived `has_project` flag; the flag is ignored on
/// the way back in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub requester: ActorId,
    pub service: String,
    pub location: String,
    pub notes: String,
    pub status: QuoteStatus,
    pub estimated_price: Option<Money>,
    pub staff_notes: Option<String>,
    /// Set exactly once, by promotion, while the quote is approved
    pub promoted_project_id: Option<ProjectId>,
    /// Optimistic concurrency token, bumped on every committed write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct QuoteRecord<'a> {
    id: QuoteId,
    requester: &'a ActorId,
    service: &'a str,
    location: &'a str,
    notes: &'a str,
    status: QuoteStatus,
    estimated_price: Option<Money>,
    staff_notes: Option<&'a str>,
    promoted_project_id: Option<ProjectId>,
    has_project: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Serialize for Quote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        QuoteRecord {
            id: self.id,
            requester: &self.requester,
            service: &self.service,
            location: &self.location,
            notes: &self.notes,
            status: self.status,
            estimated_price: self.estimated_price,
            staff_notes: self.staff_notes.as_deref(),
            promoted_project_id: self.promoted_project_id,
            has_project: self.has_project(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .serialize(serializer)
    }
}

/// Customer-supplied fields of a new quote
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub service: String,
    pub location: String,
    pub notes: String,
}

/// Support/admin edits; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteUpdate {
    pub status: Option<QuoteStatus>,
    pub estimated_price: Option<Money>,
    pub staff_notes: Option<String>,
}

impl QuoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.estimated_price.is_none() && self.staff_notes.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteFilter {
    pub status: Option<QuoteStatus>,
    pub requester: Option<ActorId>,
}

impl QuoteFilter {
    pub fn matches(&self, quote: &Quote) -> bool {
        self.status.map_or(true, |status| quote.status == status)
            && self.requester.as_ref().map_or(true, |requester| &quote.requester == requester)
    }
}

impl Quote {
    pub fn new(requester: ActorId, draft: QuoteDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: QuoteId::new(),
            requester,
            service: draft.service,
            location: draft.location,
            notes: draft.notes,
            status: QuoteStatus::Pending,
            estimated_price: None,
            staff_notes: None,
            promoted_project_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_project(&self) -> bool {
        self.promoted_project_id.is_some()
    }

    /// Copy of this record prepared as the next committed version
    pub(crate) fn next_version(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = now;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_quote_reports_project_link() {
        let draft = QuoteDraft {
            service: "gutter cleaning".into(),
            location: "9 Bay Rd".into(),
            notes: String::new(),
        };
        let mut quote = Quote::new(ActorId::from("c1"), draft, Utc::now());

        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["has_project"], false);
        assert!(json["promoted_project_id"].is_null());

        let project_id = ProjectId::new();
        quote.promoted_project_id = Some(project_id);
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["has_project"], true);
        assert_eq!(json["promoted_project_id"], project_id.to_string());

        let restored: Quote = serde_json::from_value(json).unwrap();
        assert_eq!(restored, quote);
    }
}
