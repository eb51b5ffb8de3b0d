// Project Manager - creation, claim arbitration, status advances, amendments, rating

use chrono::Utc;
use tracing::{debug, info, warn, Instrument};

use super::promotion::{link_project, LinkOutcome};
use super::{ensure_owner, require_text, EngineContext};
use crate::catalog::{EntityKind, Lifecycle, ProjectStatus};
use crate::errors::{WorkflowError, WorkflowResult};
use crate::model::{
    ActorId, Project, ProjectAmendment, ProjectDraft, ProjectFilter, ProjectId, Rating,
};
use crate::notify::WorkflowEvent;
use crate::observability::OperationTimer;
use crate::policy::{authorize, Action, Actor, ActorRole};
use crate::store::ConditionalWrite;
use crate::telemetry::{create_workflow_span, generate_correlation_id};

pub struct ProjectManager {
    ctx: EngineContext,
}

impl ProjectManager {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Direct creation by support/admin. With an originating quote the
    /// quote is linked in the same atomic unit promotion uses.
    pub async fn create(&self, actor: &Actor, draft: ProjectDraft) -> WorkflowResult<Project> {
        authorize(actor, Action::CreateProject)?;
        require_text("service", &draft.service)?;
        require_text("location", &draft.location)?;

        let project = match draft.quote_id {
            Some(quote_id) => {
                let quote = self.ctx.load_quote(quote_id).await?;
                if quote.requester != draft.customer {
                    return Err(WorkflowError::InvalidField {
                        field: "customer",
                        reason: format!("quote {quote_id} belongs to {}", quote.requester),
                    });
                }
                match link_project(&self.ctx, quote, Project::new(draft, Utc::now())).await? {
                    LinkOutcome::Created(project) => project,
                    LinkOutcome::AlreadyLinked { quote, project_id } => {
                        debug!(quote_id = %quote.id, %project_id, "Quote already has a project");
                        return Err(WorkflowError::InvalidState {
                            entity: EntityKind::Quote,
                            id: quote.id.to_string(),
                            status: quote.status.as_str(),
                            operation: "link another project to",
                        });
                    }
                }
            }
            None => {
                let project = Project::new(draft, Utc::now());
                self.ctx
                    .store
                    .apply(vec![ConditionalWrite::insert_project(project.clone())])
                    .await?;
                project
            }
        };

        info!(
            project_id = %project.id,
            customer = %project.customer,
            actor_id = %actor.id,
            "Project created"
        );
        self.ctx.notifier.publish(WorkflowEvent::ProjectCreated {
            project_id: project.id,
            quote_id: project.quote_id,
            customer: project.customer.clone(),
        });
        Ok(project)
    }

    pub async fn get(&self, actor: &Actor, id: ProjectId) -> WorkflowResult<Project> {
        authorize(actor, Action::ViewProject)?;
        let project = self.ctx.load_project(id).await?;
        ensure_owner(actor, &project.customer, Action::ViewProject)?;
        Ok(project)
    }

    pub async fn list(&self, actor: &Actor, filter: ProjectFilter) -> WorkflowResult<Vec<Project>> {
        authorize(actor, Action::ViewProject)?;
        let mut filter = filter;
        if actor.role == ActorRole::Customer {
            filter.customer = Some(actor.id.clone());
        }
        Ok(self.ctx.store.list_projects(&filter).await?)
    }

    /// Accept a pending project. At most one claim per project succeeds;
    /// every other caller gets `ClaimConflict` and should drop the project
    /// from its pending view.
    pub async fn claim(&self, id: ProjectId, actor: &Actor) -> WorkflowResult<Project> {
        authorize(actor, Action::ClaimProject)?;

        let correlation_id = generate_correlation_id();
        let span =
            create_workflow_span("claim", &id.to_string(), actor.id.as_str(), &correlation_id);
        self.claim_inner(id, &actor.id).instrument(span).await
    }

    async fn claim_inner(&self, id: ProjectId, technician: &ActorId) -> WorkflowResult<Project> {
        let timer = OperationTimer::new("claim");
        let mut attempt = 0;

        let claimed = loop {
            attempt += 1;
            let current = self.ctx.load_project(id).await?;
            if !current.is_claimable() {
                self.ctx.metrics.record_claim_lost();
                debug!(project_id = %id, holder = ?current.assigned_technician, "Claim lost");
                return Err(WorkflowError::ClaimConflict {
                    project_id: id,
                    holder: current.assigned_technician,
                });
            }

            let next = current.claimed_by(technician.clone(), Utc::now());
            match self
                .ctx
                .store
                .apply(vec![ConditionalWrite::update_project(next.clone(), current.version)])
                .await
            {
                Ok(()) => break next,
                Err(e) if self.ctx.should_retry(&e, attempt) => continue,
                Err(e) if e.is_conflict() => {
                    // Still claimable but never won the write
                    self.ctx.metrics.record_claim_lost();
                    warn!(project_id = %id, attempt, "Claim retries exhausted");
                    return Err(WorkflowError::ClaimConflict {
                        project_id: id,
                        holder: None,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        };

        self.ctx.metrics.record_claim_won();
        self.ctx.metrics.record_transition();
        timer.finish();
        info!(project_id = %id, technician = %technician, "Project claimed");
        self.ctx.notifier.publish(status_event(&claimed));
        Ok(claimed)
    }

    /// Move a project along its lifecycle. Pending to starting is a claim;
    /// every later move needs the bound technician or a support/admin override.
    pub async fn transition(
        &self,
        id: ProjectId,
        actor: &Actor,
        to: ProjectStatus,
    ) -> WorkflowResult<Project> {
        if to == ProjectStatus::Starting {
            return self.claim(id, actor).await;
        }
        let action = Action::for_project_status(to);
        authorize(actor, action)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self.ctx.load_project(id).await?;

            if !current.status.can_transition_to(to) {
                return Err(WorkflowError::InvalidTransition {
                    entity: ProjectStatus::ENTITY,
                    from: current.status.as_str(),
                    to: to.as_str(),
                });
            }
            ensure_bound(actor, &current, action)?;

            let next = current.with_status(to, Utc::now());
            match self
                .ctx
                .store
                .apply(vec![ConditionalWrite::update_project(next.clone(), current.version)])
                .await
            {
                Ok(()) => {}
                Err(e) if self.ctx.should_retry(&e, attempt) => {
                    warn!(project_id = %id, attempt, "Project changed during transition, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            self.ctx.metrics.record_transition();
            info!(
                project_id = %id,
                actor_id = %actor.id,
                from = %current.status,
                to = %to,
                "Project status changed"
            );
            self.ctx.notifier.publish(status_event(&next));
            return Ok(next);
        }
    }

    /// Advance one step along the main line
    pub async fn advance(&self, id: ProjectId, actor: &Actor) -> WorkflowResult<Project> {
        authorize(actor, Action::AdvanceProject)?;
        let current = self.ctx.load_project(id).await?;
        match current.status.next() {
            Some(to) => self.transition(id, actor, to).await,
            None => Err(WorkflowError::InvalidState {
                entity: EntityKind::Project,
                id: id.to_string(),
                status: current.status.as_str(),
                operation: "advance",
            }),
        }
    }

    pub async fn cancel(&self, id: ProjectId, actor: &Actor) -> WorkflowResult<Project> {
        self.transition(id, actor, ProjectStatus::Cancelled).await
    }

    /// Price, schedule and technician notes; never touches status
    pub async fn amend(
        &self,
        id: ProjectId,
        actor: &Actor,
        amendment: ProjectAmendment,
    ) -> WorkflowResult<Project> {
        authorize(actor, Action::AmendProject)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self.ctx.load_project(id).await?;
            ensure_bound(actor, &current, Action::AmendProject)?;
            if current.status == ProjectStatus::Cancelled {
                return Err(WorkflowError::InvalidState {
                    entity: EntityKind::Project,
                    id: id.to_string(),
                    status: current.status.as_str(),
                    operation: "amend",
                });
            }
            if amendment.is_empty() {
                return Ok(current);
            }

            let mut next = current.next_version(Utc::now());
            if let Some(price) = amendment.final_price {
                next.final_price = Some(price);
            }
            if let Some(date) = amendment.scheduled_date {
                next.scheduled_date = Some(date);
            }
            if let Some(notes) = &amendment.technician_notes {
                next.technician_notes = Some(notes.clone());
            }

            match self
                .ctx
                .store
                .apply(vec![ConditionalWrite::update_project(next.clone(), current.version)])
                .await
            {
                Ok(()) => {
                    info!(project_id = %id, actor_id = %actor.id, "Project amended");
                    return Ok(next);
                }
                Err(e) if self.ctx.should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Write-once customer rating on a completed project
    pub async fn rate(
        &self,
        id: ProjectId,
        actor: &Actor,
        stars: u8,
        review: Option<String>,
    ) -> WorkflowResult<Project> {
        authorize(actor, Action::RateProject)?;
        let rating = Rating::try_from(stars).map_err(|e| WorkflowError::InvalidField {
            field: "rating",
            reason: e.to_string(),
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self.ctx.load_project(id).await?;
            ensure_owner(actor, &current.customer, Action::RateProject)?;
            if current.status != ProjectStatus::Completed {
                return Err(WorkflowError::InvalidState {
                    entity: EntityKind::Project,
                    id: id.to_string(),
                    status: current.status.as_str(),
                    operation: "rate",
                });
            }
            if current.rating.is_some() {
                return Err(WorkflowError::OneTimeField { field: "rating" });
            }

            let mut next = current.next_version(Utc::now());
            next.rating = Some(rating);
            next.review = review.clone();

            match self
                .ctx
                .store
                .apply(vec![ConditionalWrite::update_project(next.clone(), current.version)])
                .await
            {
                Ok(()) => {
                    info!(project_id = %id, stars = rating.stars(), "Project rated");
                    return Ok(next);
                }
                Err(e) if self.ctx.should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Post-claim writes belong to the bound technician unless overridden
fn ensure_bound(actor: &Actor, project: &Project, action: Action) -> WorkflowResult<()> {
    if actor.role.has_override() || project.is_bound_to(&actor.id) {
        return Ok(());
    }
    Err(WorkflowError::Authorization {
        actor: actor.id.clone(),
        role: actor.role,
        action,
    })
}

fn status_event(project: &Project) -> WorkflowEvent {
    WorkflowEvent::ProjectStatusChanged {
        project_id: project.id,
        status: project.status,
        customer: project.customer.clone(),
        technician: project.assigned_technician.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineSettings, WorkflowEngine};
    use crate::errors::ErrorKind;
    use crate::model::Money;
    use crate::notify::RecordingSink;
    use crate::store::{MemoryStore, MockWorkflowStore, StoreError};
    use std::sync::Arc;

    fn engine() -> (WorkflowEngine, RecordingSink) {
        let sink = RecordingSink::new();
        let engine = WorkflowEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(sink.clone()),
            EngineSettings::default(),
        );
        (engine, sink)
    }

    fn draft(customer: &str) -> ProjectDraft {
        ProjectDraft {
            quote_id: None,
            customer: ActorId::from(customer),
            service: "deck repair".to_string(),
            location: "4 Birch Rd".to_string(),
            notes: String::new(),
            scheduled_date: None,
        }
    }

    async fn pending_project(engine: &WorkflowEngine) -> Project {
        engine.projects().create(&Actor::support("s1"), draft("c1")).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_starts_pending_and_unassigned() {
        let (engine, sink) = engine();
        let project = pending_project(&engine).await;
        assert_eq!(project.status, ProjectStatus::Pending);
        assert_eq!(project.assigned_technician, None);
        assert_eq!(project.final_price, None);
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.events()[0].event_type(), "project_created");
    }

    #[tokio::test]
    async fn test_staff_cannot_create_directly() {
        let (engine, _) = engine();
        let err = engine.projects().create(&Actor::staff("t1"), draft("c1")).await.unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn test_claim_binds_technician() {
        let (engine, _) = engine();
        let project = pending_project(&engine).await;

        let claimed = engine.projects().claim(project.id, &Actor::staff("t1")).await.unwrap();
        assert_eq!(claimed.status, ProjectStatus::Starting);
        assert_eq!(claimed.assigned_technician, Some(ActorId::from("t1")));

        let err = engine.projects().claim(project.id, &Actor::staff("t2")).await.unwrap_err();
        match err {
            WorkflowError::ClaimConflict { holder, .. } => {
                assert_eq!(holder, Some(ActorId::from("t1")))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.metrics().snapshot().claims_won, 1);
        assert_eq!(engine.metrics().snapshot().claims_lost, 1);
    }

    #[tokio::test]
    async fn test_claim_requires_staff_role() {
        let (engine, _) = engine();
        let project = pending_project(&engine).await;
        let err = engine.projects().claim(project.id, &Actor::customer("c1")).await.unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn test_unclaimed_project_cannot_start_work() {
        let (engine, _) = engine();
        let project = pending_project(&engine).await;
        let err = engine
            .projects()
            .transition(project.id, &Actor::admin("a1"), ProjectStatus::InProgress)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_transition_to_starting_routes_through_claim() {
        let (engine, _) = engine();
        let project = pending_project(&engine).await;
        let claimed = engine
            .projects()
            .transition(project.id, &Actor::staff("t1"), ProjectStatus::Starting)
            .await
            .unwrap();
        assert!(claimed.is_bound_to(&ActorId::from("t1")));
    }

    #[tokio::test]
    async fn test_only_bound_technician_advances() {
        let (engine, _) = engine();
        let project = pending_project(&engine).await;
        engine.projects().claim(project.id, &Actor::staff("t1")).await.unwrap();

        let err = engine.projects().advance(project.id, &Actor::staff("t2")).await.unwrap_err();
        assert!(err.is_authorization());

        let started = engine.projects().advance(project.id, &Actor::staff("t1")).await.unwrap();
        assert_eq!(started.status, ProjectStatus::InProgress);
        assert!(started.started_at.is_some());

        let review = engine.projects().advance(project.id, &Actor::admin("a1")).await.unwrap();
        assert_eq!(review.status, ProjectStatus::WaitingForReview);
        let done = engine.projects().advance(project.id, &Actor::staff("t1")).await.unwrap();
        assert_eq!(done.status, ProjectStatus::Completed);
        assert!(done.completed_at.is_some());

        let err = engine.projects().advance(project.id, &Actor::admin("a1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_customer_cannot_advance_any_project() {
        let (engine, _) = engine();
        let project = pending_project(&engine).await;
        let tech = Actor::staff("t1");
        engine.projects().claim(project.id, &tech).await.unwrap();
        for _ in 0..3 {
            engine.projects().advance(project.id, &tech).await.unwrap();
        }

        // Refused before the record is read
        let customer = Actor::customer("c2");
        let err = engine.projects().advance(project.id, &customer).await.unwrap_err();
        assert!(err.is_authorization());
        let err = engine.projects().advance(ProjectId::new(), &customer).await.unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn test_cancel_is_final() {
        let (engine, sink) = engine();
        let project = pending_project(&engine).await;

        let err = engine.projects().cancel(project.id, &Actor::staff("t1")).await.unwrap_err();
        assert!(err.is_authorization(), "unbound staff cannot cancel");

        let cancelled = engine.projects().cancel(project.id, &Actor::support("s1")).await.unwrap();
        assert_eq!(cancelled.status, ProjectStatus::Cancelled);
        assert_eq!(cancelled.assigned_technician, None);

        let err = engine.projects().claim(project.id, &Actor::staff("t1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimConflict);
        let err = engine
            .projects()
            .amend(project.id, &Actor::admin("a1"), ProjectAmendment::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(sink.events().last().map(|e| e.event_type()), Some("project_status_changed"));
    }

    #[tokio::test]
    async fn test_amend_sets_price_without_event() {
        let (engine, sink) = engine();
        let project = pending_project(&engine).await;
        engine.projects().claim(project.id, &Actor::staff("t1")).await.unwrap();
        sink.clear();

        let amended = engine
            .projects()
            .amend(
                project.id,
                &Actor::staff("t1"),
                ProjectAmendment {
                    final_price: Some(Money::from_units(650)),
                    technician_notes: Some("replaced two joists".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(amended.final_price, Some(Money::from_units(650)));
        assert_eq!(amended.status, ProjectStatus::Starting);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_rating_is_write_once_after_completion() {
        let (engine, _) = engine();
        let project = pending_project(&engine).await;
        let customer = Actor::customer("c1");

        let err = engine.projects().rate(project.id, &customer, 5, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let tech = Actor::staff("t1");
        engine.projects().claim(project.id, &tech).await.unwrap();
        for _ in 0..3 {
            engine.projects().advance(project.id, &tech).await.unwrap();
        }

        let err = engine.projects().rate(project.id, &customer, 6, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidField);
        let err = engine
            .projects()
            .rate(project.id, &Actor::customer("c2"), 4, None)
            .await
            .unwrap_err();
        assert!(err.is_authorization());

        let rated = engine
            .projects()
            .rate(project.id, &customer, 4, Some("tidy work".into()))
            .await
            .unwrap();
        assert_eq!(rated.rating.map(Rating::stars), Some(4));
        assert_eq!(rated.review.as_deref(), Some("tidy work"));

        let err = engine.projects().rate(project.id, &customer, 1, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OneTimeField);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_storage_error() {
        let project = Project::new(draft("c1"), Utc::now());
        let mut store = MockWorkflowStore::new();
        let stored = project.clone();
        store
            .expect_get_project()
            .returning(move |_| Ok(Some(stored.clone())));
        store
            .expect_apply()
            .times(1)
            .returning(|_| Err(StoreError::Task("writer gone".into())));

        let engine = WorkflowEngine::new(
            Arc::new(store),
            Arc::new(RecordingSink::new()),
            EngineSettings::default(),
        );
        let err = engine.projects().claim(project.id, &Actor::staff("t1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(engine.metrics().snapshot().claims_won, 0);
    }

    #[tokio::test]
    async fn test_claim_retries_exhausted_is_conflict() {
        let project = Project::new(draft("c1"), Utc::now());
        let mut store = MockWorkflowStore::new();
        let stored = project.clone();
        store
            .expect_get_project()
            .returning(move |_| Ok(Some(stored.clone())));
        store.expect_apply().times(2).returning(|writes| {
            Err(StoreError::Conflict {
                entity: writes[0].record.entity(),
                id: writes[0].record.id(),
                expected: writes[0].expected.to_string(),
                found: "2".into(),
            })
        });

        let engine = WorkflowEngine::new(
            Arc::new(store),
            Arc::new(RecordingSink::new()),
            EngineSettings { max_write_retries: 2 },
        );
        let err = engine.projects().claim(project.id, &Actor::staff("t1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimConflict);
        assert_eq!(engine.metrics().snapshot().write_conflicts, 2);
    }
}
