// Closed status vocabulary shared by every client surface

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The two record types governed by the workflow engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Quote,
    Project,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Quote => "quote",
            EntityKind::Project => "project",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {entity} status '{value}'")]
pub struct UnknownStatus {
    pub entity: EntityKind,
    pub value: String,
}

/// Quote lifecycle: pending until support/admin decides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Approved,
    Rejected,
}

/// Project lifecycle, ordered along the happy path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Starting,
    InProgress,
    WaitingForReview,
    Completed,
    Cancelled,
}

const QUOTE_TRANSITIONS: &[(QuoteStatus, QuoteStatus)] = &[
    (QuoteStatus::Pending, QuoteStatus::Approved),
    (QuoteStatus::Pending, QuoteStatus::Rejected),
];

const PROJECT_TRANSITIONS: &[(ProjectStatus, ProjectStatus)] = &[
    (ProjectStatus::Pending, ProjectStatus::Starting),
    (ProjectStatus::Starting, ProjectStatus::InProgress),
    (ProjectStatus::InProgress, ProjectStatus::WaitingForReview),
    (ProjectStatus::WaitingForReview, ProjectStatus::Completed),
    (ProjectStatus::Pending, ProjectStatus::Cancelled),
    (ProjectStatus::Starting, ProjectStatus::Cancelled),
    (ProjectStatus::InProgress, ProjectStatus::Cancelled),
    (ProjectStatus::WaitingForReview, ProjectStatus::Cancelled),
];

/// Common surface of both status enums.
///
/// The transition table is a pure function of (entity, current, requested);
/// it knows nothing about who is asking.
pub trait Lifecycle: Copy + Eq + fmt::Debug + 'static {
    const ENTITY: EntityKind;

    fn all() -> &'static [Self];
    fn transitions() -> &'static [(Self, Self)];
    fn as_str(self) -> &'static str;

    fn can_transition_to(self, next: Self) -> bool {
        Self::transitions()
            .iter()
            .any(|&(from, to)| from == self && to == next)
    }

    fn allowed_targets(self) -> Vec<Self> {
        Self::transitions()
            .iter()
            .filter(|(from, _)| *from == self)
            .map(|&(_, to)| to)
            .collect()
    }

    fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl Lifecycle for QuoteStatus {
    const ENTITY: EntityKind = EntityKind::Quote;

    fn all() -> &'static [Self] {
        &[QuoteStatus::Pending, QuoteStatus::Approved, QuoteStatus::Rejected]
    }

    fn transitions() -> &'static [(Self, Self)] {
        QUOTE_TRANSITIONS
    }

    fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Rejected => "rejected",
        }
    }
}

impl Lifecycle for ProjectStatus {
    const ENTITY: EntityKind = EntityKind::Project;

    fn all() -> &'static [Self] {
        &[
            ProjectStatus::Pending,
            ProjectStatus::Starting,
            ProjectStatus::InProgress,
            ProjectStatus::WaitingForReview,
            ProjectStatus::Completed,
            ProjectStatus::Cancelled,
        ]
    }

    fn transitions() -> &'static [(Self, Self)] {
        PROJECT_TRANSITIONS
    }

    fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Starting => "starting",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::WaitingForReview => "waiting_for_review",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl ProjectStatus {
    /// Next step along the happy path, if any
    pub fn next(self) -> Option<ProjectStatus> {
        match self {
            ProjectStatus::Pending => Some(ProjectStatus::Starting),
            ProjectStatus::Starting => Some(ProjectStatus::InProgress),
            ProjectStatus::InProgress => Some(ProjectStatus::WaitingForReview),
            ProjectStatus::WaitingForReview => Some(ProjectStatus::Completed),
            ProjectStatus::Completed | ProjectStatus::Cancelled => None,
        }
    }
}

fn parse_status<S: Lifecycle>(value: &str) -> Result<S, UnknownStatus> {
    S::all()
        .iter()
        .copied()
        .find(|status| status.as_str() == value)
        .ok_or_else(|| UnknownStatus {
            entity: S::ENTITY,
            value: value.to_string(),
        })
}

impl FromStr for QuoteStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}

impl FromStr for ProjectStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s)
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String-vocabulary form of the transition table for clients that only
/// hold wire values.
pub fn transition_allowed(entity: EntityKind, from: &str, to: &str) -> Result<bool, UnknownStatus> {
    fn check<S: Lifecycle>(from: &str, to: &str) -> Result<bool, UnknownStatus> {
        let from: S = parse_status(from)?;
        let to: S = parse_status(to)?;
        Ok(from.can_transition_to(to))
    }

    match entity {
        EntityKind::Quote => check::<QuoteStatus>(from, to),
        EntityKind::Project => check::<ProjectStatus>(from, to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_transitions_only_leave_pending() {
        assert!(QuoteStatus::Pending.can_transition_to(QuoteStatus::Approved));
        assert!(QuoteStatus::Pending.can_transition_to(QuoteStatus::Rejected));
        assert!(!QuoteStatus::Approved.can_transition_to(QuoteStatus::Pending));
        assert!(!QuoteStatus::Rejected.can_transition_to(QuoteStatus::Approved));
        assert!(!QuoteStatus::Pending.can_transition_to(QuoteStatus::Pending));
        assert!(QuoteStatus::Approved.is_terminal());
        assert!(QuoteStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_project_happy_path_is_strictly_ordered() {
        let mut status = ProjectStatus::Pending;
        while let Some(next) = status.next() {
            assert!(status.can_transition_to(next));
            assert!(next > status);
            assert!(!next.can_transition_to(status));
            status = next;
        }
        assert_eq!(status, ProjectStatus::Completed);
    }

    #[test]
    fn test_cancellation_reachable_from_every_non_terminal_state() {
        for &status in ProjectStatus::all() {
            let terminal = matches!(status, ProjectStatus::Completed | ProjectStatus::Cancelled);
            assert_eq!(status.is_terminal(), terminal, "{status}");
            assert_eq!(status.can_transition_to(ProjectStatus::Cancelled), !terminal, "{status}");
        }
    }

    #[test]
    fn test_no_skipping_steps() {
        assert!(!ProjectStatus::Pending.can_transition_to(ProjectStatus::InProgress));
        assert!(!ProjectStatus::Starting.can_transition_to(ProjectStatus::Completed));
        assert!(!ProjectStatus::InProgress.can_transition_to(ProjectStatus::Completed));
    }

    #[test]
    fn test_wire_vocabulary() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::WaitingForReview).unwrap(),
            "\"waiting_for_review\""
        );
        assert_eq!("in_progress".parse::<ProjectStatus>().unwrap(), ProjectStatus::InProgress);
        assert_eq!("approved".parse::<QuoteStatus>().unwrap(), QuoteStatus::Approved);
        assert!("done".parse::<ProjectStatus>().is_err());
        for &status in ProjectStatus::all() {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_string_transition_table() {
        assert_eq!(transition_allowed(EntityKind::Quote, "pending", "approved"), Ok(true));
        assert_eq!(transition_allowed(EntityKind::Project, "completed", "cancelled"), Ok(false));
        assert!(transition_allowed(EntityKind::Project, "pending", "approved").is_err());
    }
}
