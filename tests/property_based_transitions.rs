// Property-Based Testing for status progression
// Whatever sequence of transitions callers request, committed statuses never regress

use proptest::prelude::*;
use std::sync::Arc;

use fieldflow::notify::sinks::NullSink;
use fieldflow::store::MemoryStore;
use fieldflow::{
    transition_allowed, Actor, ActorId, EngineSettings, EntityKind, Lifecycle, ProjectDraft,
    ProjectStatus, QuoteStatus, WorkflowEngine,
};

fn project_status_strategy() -> impl Strategy<Value = ProjectStatus> {
    prop::sample::select(ProjectStatus::all().to_vec())
}

fn quote_status_strategy() -> impl Strategy<Value = QuoteStatus> {
    prop::sample::select(QuoteStatus::all().to_vec())
}

fn rank(status: ProjectStatus) -> usize {
    match status {
        ProjectStatus::Pending => 0,
        ProjectStatus::Starting => 1,
        ProjectStatus::InProgress => 2,
        ProjectStatus::WaitingForReview => 3,
        ProjectStatus::Completed => 4,
        ProjectStatus::Cancelled => 5,
    }
}

proptest! {
    #[test]
    fn table_only_moves_forward(
        from in project_status_strategy(),
        to in project_status_strategy(),
    ) {
        if from.can_transition_to(to) {
            prop_assert!(rank(to) > rank(from));
            prop_assert!(!from.is_terminal());
        }
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }

    #[test]
    fn quote_decisions_are_final(from in quote_status_strategy(), to in quote_status_strategy()) {
        if from != QuoteStatus::Pending {
            prop_assert!(!from.can_transition_to(to));
        }
        prop_assert_eq!(
            transition_allowed(EntityKind::Quote, from.as_str(), to.as_str()).unwrap(),
            from.can_transition_to(to)
        );
    }

    #[test]
    fn committed_project_statuses_never_regress(
        requests in prop::collection::vec(project_status_strategy(), 1..12),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let engine = WorkflowEngine::new(
                Arc::new(MemoryStore::new()),
                Arc::new(NullSink),
                EngineSettings::default(),
            );
            let project = engine
                .projects()
                .create(
                    &Actor::admin("a1"),
                    ProjectDraft {
                        quote_id: None,
                        customer: ActorId::from("c1"),
                        service: "lawn care".into(),
                        location: "2 Green St".into(),
                        notes: String::new(),
                        scheduled_date: None,
                    },
                )
                .await
                .unwrap();

            let admin = Actor::admin("a1");
            let mut current = project.status;
            for to in requests {
                match engine.projects().transition(project.id, &admin, to).await {
                    Ok(next) => {
                        prop_assert!(current.can_transition_to(next.status));
                        prop_assert!(rank(next.status) > rank(current));
                        let unbound = next.status == ProjectStatus::Pending
                            || (next.status == ProjectStatus::Cancelled
                                && current == ProjectStatus::Pending);
                        prop_assert_eq!(next.assigned_technician.is_none(), unbound);
                        current = next.status;
                    }
                    Err(_) => {
                        let stored = engine.projects().get(&admin, project.id).await.unwrap();
                        prop_assert_eq!(stored.status, current);
                    }
                }
            }
            Ok(())
        })?;
    }
}
