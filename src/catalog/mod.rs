// Status Catalog - the closed vocabulary and transition table every client shares

pub mod display;
pub mod status;

pub use display::{catalog, CatalogEntry, StatusDisplay};
pub use status::{
    transition_allowed, EntityKind, Lifecycle, ProjectStatus, QuoteStatus, UnknownStatus,
};
