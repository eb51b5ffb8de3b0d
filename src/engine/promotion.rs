// Promotion Coordinator - approved quote to pending project, exactly once per quote

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, Instrument};

use super::{ensure_owner, EngineContext};
use crate::catalog::{Lifecycle, QuoteStatus};
use crate::errors::{WorkflowError, WorkflowResult};
use crate::model::{Project, ProjectId, Quote, QuoteId};
use crate::notify::WorkflowEvent;
use crate::observability::OperationTimer;
use crate::policy::{authorize, Action, Actor};
use crate::store::ConditionalWrite;
use crate::telemetry::{create_workflow_span, generate_correlation_id};

/// Result of `promote`: the quote's one project, and whether this call made it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Promotion {
    pub project: Project,
    pub created: bool,
}

pub(crate) enum LinkOutcome {
    Created(Project),
    AlreadyLinked { quote: Quote, project_id: ProjectId },
}

/// Commit "quote gets a project id" and "project exists" as one batch.
///
/// The quote write is guarded by its version, so of two racing callers only
/// one batch lands; the other re-reads and sees the link.
pub(crate) async fn link_project(
    ctx: &EngineContext,
    quote: Quote,
    project: Project,
) -> WorkflowResult<LinkOutcome> {
    let mut quote = quote;
    let mut attempt = 0;
    loop {
        attempt += 1;
        if let Some(project_id) = quote.promoted_project_id {
            return Ok(LinkOutcome::AlreadyLinked { quote, project_id });
        }
        if quote.status != QuoteStatus::Approved {
            return Err(WorkflowError::InvalidState {
                entity: QuoteStatus::ENTITY,
                id: quote.id.to_string(),
                status: quote.status.as_str(),
                operation: "promote",
            });
        }

        let mut linked = quote.next_version(Utc::now());
        linked.promoted_project_id = Some(project.id);

        match ctx
            .store
            .apply(vec![
                ConditionalWrite::update_quote(linked, quote.version),
                ConditionalWrite::insert_project(project.clone()),
            ])
            .await
        {
            Ok(()) => return Ok(LinkOutcome::Created(project)),
            Err(e) if ctx.should_retry(&e, attempt) => {
                debug!(quote_id = %quote.id, attempt, "Quote changed during promotion, re-reading");
                quote = ctx.load_quote(quote.id).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub struct PromotionCoordinator {
    ctx: EngineContext,
}

impl PromotionCoordinator {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Turn the owner's approved quote into a pending project.
    ///
    /// Idempotent: once a quote has a project, every later call returns that
    /// project with `created == false` instead of failing.
    pub async fn promote(&self, quote_id: QuoteId, actor: &Actor) -> WorkflowResult<Promotion> {
        authorize(actor, Action::PromoteQuote)?;

        let correlation_id = generate_correlation_id();
        let span = create_workflow_span(
            "promote",
            &quote_id.to_string(),
            actor.id.as_str(),
            &correlation_id,
        );
        self.promote_inner(quote_id, actor).instrument(span).await
    }

    async fn promote_inner(&self, quote_id: QuoteId, actor: &Actor) -> WorkflowResult<Promotion> {
        let timer = OperationTimer::new("promote");
        let quote = self.ctx.load_quote(quote_id).await?;
        ensure_owner(actor, &quote.requester, Action::PromoteQuote)?;

        let project = Project::from_quote(&quote, Utc::now());
        let promotion = match link_project(&self.ctx, quote, project).await? {
            LinkOutcome::Created(project) => {
                info!(quote_id = %quote_id, project_id = %project.id, "Quote promoted");
                self.ctx.notifier.publish(WorkflowEvent::QuotePromoted {
                    quote_id,
                    project_id: project.id,
                    customer: project.customer.clone(),
                });
                Promotion { project, created: true }
            }
            LinkOutcome::AlreadyLinked { project_id, .. } => {
                debug!(quote_id = %quote_id, project_id = %project_id, "Quote already promoted");
                Promotion {
                    project: self.ctx.load_project(project_id).await?,
                    created: false,
                }
            }
        };

        self.ctx.metrics.record_promotion(promotion.created);
        timer.finish();
        Ok(promotion)
    }
}
