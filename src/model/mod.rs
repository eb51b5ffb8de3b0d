// Records governed by the workflow engine

pub mod ids;
pub mod money;
pub mod project;
pub mod quote;

pub use ids::{ActorId, ProjectId, QuoteId};
pub use money::{InvalidAmount, InvalidRating, Money, Rating};
pub use project::{Project, ProjectAmendment, ProjectDraft, ProjectFilter};
pub use quote::{Quote, QuoteDraft, QuoteFilter, QuoteUpdate};
