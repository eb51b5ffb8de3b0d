// In-process record tables shared by the memory and file backends

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::traits::{ConditionalWrite, Expected, Record, StoreError};
use crate::model::{Project, ProjectFilter, ProjectId, Quote, QuoteFilter, QuoteId};

#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    quotes: HashMap<QuoteId, Quote>,
    projects: HashMap<ProjectId, Project>,
}

/// On-disk shape of [`Tables`]
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Tables {
    pub fn get_quote(&self, id: QuoteId) -> Option<Quote> {
        self.quotes.get(&id).cloned()
    }

    pub fn get_project(&self, id: ProjectId) -> Option<Project> {
        self.projects.get(&id).cloned()
    }

    pub fn list_quotes(&self, filter: &QuoteFilter) -> Vec<Quote> {
        let mut quotes: Vec<Quote> = self
            .quotes
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        quotes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        quotes
    }

    pub fn list_projects(&self, filter: &ProjectFilter) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .projects
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        projects
    }

    fn stored_version(&self, record: &Record) -> Option<u64> {
        match record {
            Record::Quote(q) => self.quotes.get(&q.id).map(|q| q.version),
            Record::Project(p) => self.projects.get(&p.id).map(|p| p.version),
        }
    }

    /// Checks every precondition first, then writes; nothing changes on conflict.
    pub fn apply(&mut self, writes: Vec<ConditionalWrite>) -> Result<(), StoreError> {
        for write in &writes {
            let found = self.stored_version(&write.record);
            let holds = match (write.expected, found) {
                (Expected::Absent, None) => true,
                (Expected::Version(expected), Some(current)) => expected == current,
                _ => false,
            };
            if !holds {
                return Err(StoreError::Conflict {
                    entity: write.record.entity(),
                    id: write.record.id(),
                    expected: write.expected.to_string(),
                    found: found.map_or_else(|| "absent".to_string(), |v| format!("version {v}")),
                });
            }
        }

        for write in writes {
            match write.record {
                Record::Quote(q) => {
                    self.quotes.insert(q.id, q);
                }
                Record::Project(p) => {
                    self.projects.insert(p.id, p);
                }
            }
        }
        Ok(())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            quotes: snapshot.quotes.into_iter().map(|q| (q.id, q)).collect(),
            projects: snapshot.projects.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            quotes: self.list_quotes(&QuoteFilter::default()),
            projects: self.list_projects(&ProjectFilter::default()),
        }
    }
}
