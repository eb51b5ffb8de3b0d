// Display constants for every status, consumed by all three client surfaces

use serde::Serialize;

use super::status::{EntityKind, Lifecycle, ProjectStatus, QuoteStatus};

/// How a status is presented to people
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

const fn display(label: &'static str, icon: &'static str, color: &'static str) -> StatusDisplay {
    StatusDisplay { label, icon, color }
}

impl QuoteStatus {
    pub fn display(self) -> StatusDisplay {
        match self {
            QuoteStatus::Pending => display("Pending review", "hourglass", "#F5A623"),
            QuoteStatus::Approved => display("Approved", "check-circle", "#2E7D32"),
            QuoteStatus::Rejected => display("Rejected", "x-circle", "#C62828"),
        }
    }
}

impl ProjectStatus {
    pub fn display(self) -> StatusDisplay {
        match self {
            ProjectStatus::Pending => display("Awaiting technician", "inbox", "#F5A623"),
            ProjectStatus::Starting => display("Starting", "play-circle", "#0288D1"),
            ProjectStatus::InProgress => display("In progress", "tool", "#1565C0"),
            ProjectStatus::WaitingForReview => display("Waiting for review", "eye", "#6A1B9A"),
            ProjectStatus::Completed => display("Completed", "check-circle", "#2E7D32"),
            ProjectStatus::Cancelled => display("Cancelled", "slash", "#616161"),
        }
    }
}

/// One row of the published catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub entity: EntityKind,
    pub status: &'static str,
    pub terminal: bool,
    pub next: Vec<&'static str>,
    #[serde(flatten)]
    pub display: StatusDisplay,
}

fn entries_for<S, F>(display: F) -> Vec<CatalogEntry>
where
    S: Lifecycle,
    F: Fn(S) -> StatusDisplay,
{
    S::all()
        .iter()
        .map(|&status| CatalogEntry {
            entity: S::ENTITY,
            status: status.as_str(),
            terminal: status.is_terminal(),
            next: status.allowed_targets().into_iter().map(S::as_str).collect(),
            display: display(status),
        })
        .collect()
}

/// The full status catalog: vocabulary, transitions and presentation in one table
pub fn catalog() -> Vec<CatalogEntry> {
    let mut entries = entries_for(QuoteStatus::display);
    entries.extend(entries_for(ProjectStatus::display));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_status() {
        let entries = catalog();
        assert_eq!(entries.len(), QuoteStatus::all().len() + ProjectStatus::all().len());

        let pending_project = entries
            .iter()
            .find(|e| e.entity == EntityKind::Project && e.status == "pending")
            .unwrap();
        assert_eq!(pending_project.next, vec!["starting", "cancelled"]);
        assert!(!pending_project.terminal);
    }

    #[test]
    fn test_labels_are_unique_per_entity() {
        let mut labels: Vec<_> = ProjectStatus::all().iter().map(|s| s.display().label).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), ProjectStatus::all().len());
    }
}
