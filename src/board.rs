// Client-side project cache. The engine is the source of truth: after every
// mutating call the board adopts the returned record, never its own guess.

use std::collections::HashMap;
use tracing::debug;

use crate::catalog::ProjectStatus;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::model::{Project, ProjectId};

/// What reconciling one call result did to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardChange {
    Adopted,
    Dropped,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ProjectBoard {
    projects: HashMap<ProjectId, Project>,
}

impl ProjectBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with a fresh listing
    pub fn refresh(&mut self, projects: Vec<Project>) {
        self.projects = projects.into_iter().map(|p| (p.id, p)).collect();
    }

    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Projects still open for claiming, oldest first
    pub fn pending(&self) -> Vec<&Project> {
        let mut pending: Vec<&Project> = self
            .projects
            .values()
            .filter(|p| p.status == ProjectStatus::Pending)
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending
    }

    /// Keep the canonical record unless the cache already holds a newer one
    pub fn adopt(&mut self, project: Project) -> BoardChange {
        match self.projects.get(&project.id) {
            Some(cached) if cached.version > project.version => BoardChange::Unchanged,
            _ => {
                self.projects.insert(project.id, project);
                BoardChange::Adopted
            }
        }
    }

    pub fn forget(&mut self, id: ProjectId) -> BoardChange {
        match self.projects.remove(&id) {
            Some(_) => BoardChange::Dropped,
            None => BoardChange::Unchanged,
        }
    }

    /// Fold the outcome of a mutating engine call into the cache.
    ///
    /// A lost claim drops the project without a re-fetch; any other error
    /// leaves the cache as it was.
    pub fn reconcile(&mut self, result: &WorkflowResult<Project>) -> BoardChange {
        match result {
            Ok(project) => self.adopt(project.clone()),
            Err(WorkflowError::ClaimConflict { project_id, .. }) => {
                debug!(project_id = %project_id, "Dropping project lost to another claim");
                self.forget(*project_id)
            }
            Err(_) => BoardChange::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorId, ProjectDraft};
    use chrono::{Duration, Utc};

    fn project(offset_secs: i64) -> Project {
        Project::new(
            ProjectDraft {
                quote_id: None,
                customer: ActorId::from("c1"),
                service: "gutter cleaning".into(),
                location: "1 Pine Ct".into(),
                notes: String::new(),
                scheduled_date: None,
            },
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[test]
    fn test_claim_conflict_drops_project() {
        let mut board = ProjectBoard::new();
        let p = project(0);
        board.refresh(vec![p.clone(), project(1)]);

        let lost = Err(WorkflowError::ClaimConflict {
            project_id: p.id,
            holder: Some(ActorId::from("t2")),
        });
        assert_eq!(board.reconcile(&lost), BoardChange::Dropped);
        assert!(board.get(p.id).is_none());
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_success_adopts_canonical_record() {
        let mut board = ProjectBoard::new();
        let p = project(0);
        board.refresh(vec![p.clone()]);

        let claimed = p.claimed_by(ActorId::from("t1"), Utc::now());
        assert_eq!(board.reconcile(&Ok(claimed.clone())), BoardChange::Adopted);
        assert_eq!(board.get(p.id), Some(&claimed));
        assert!(board.pending().is_empty());

        // A stale copy never overwrites a newer one
        assert_eq!(board.adopt(p), BoardChange::Unchanged);
    }

    #[test]
    fn test_other_errors_leave_cache_alone() {
        let mut board = ProjectBoard::new();
        let p = project(0);
        board.refresh(vec![p.clone()]);

        let err = Err(WorkflowError::OneTimeField { field: "rating" });
        assert_eq!(board.reconcile(&err), BoardChange::Unchanged);
        assert_eq!(board.get(p.id), Some(&p));
    }

    #[test]
    fn test_pending_sorted_oldest_first() {
        let mut board = ProjectBoard::new();
        let newer = project(10);
        let older = project(0);
        board.refresh(vec![newer.clone(), older.clone()]);
        let ids: Vec<ProjectId> = board.pending().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }
}
