// Quote Manager - creation by customers, decisions and amendments by support/admin

use chrono::Utc;
use tracing::{info, warn};

use super::{ensure_owner, require_text, EngineContext};
use crate::catalog::{Lifecycle, QuoteStatus};
use crate::errors::{WorkflowError, WorkflowResult};
use crate::model::{Quote, QuoteDraft, QuoteFilter, QuoteId, QuoteUpdate};
use crate::notify::WorkflowEvent;
use crate::policy::{authorize, Action, Actor, ActorRole};
use crate::store::ConditionalWrite;

pub struct QuoteManager {
    ctx: EngineContext,
}

impl QuoteManager {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// New pending quote owned by `requester`, without a price
    pub async fn create(&self, requester: &Actor, draft: QuoteDraft) -> WorkflowResult<Quote> {
        authorize(requester, Action::CreateQuote)?;
        require_text("service", &draft.service)?;
        require_text("location", &draft.location)?;

        let quote = Quote::new(requester.id.clone(), draft, Utc::now());
        self.ctx
            .store
            .apply(vec![ConditionalWrite::insert_quote(quote.clone())])
            .await?;

        info!(
            quote_id = %quote.id,
            requester = %quote.requester,
            service = %quote.service,
            "Quote requested"
        );
        Ok(quote)
    }

    pub async fn get(&self, actor: &Actor, id: QuoteId) -> WorkflowResult<Quote> {
        authorize(actor, Action::ViewQuote)?;
        let quote = self.ctx.load_quote(id).await?;
        ensure_owner(actor, &quote.requester, Action::ViewQuote)?;
        Ok(quote)
    }

    /// Customers only ever see their own quotes, whatever the filter says
    pub async fn list(&self, actor: &Actor, filter: QuoteFilter) -> WorkflowResult<Vec<Quote>> {
        authorize(actor, Action::ViewQuote)?;
        let mut filter = filter;
        if actor.role == ActorRole::Customer {
            filter.requester = Some(actor.id.clone());
        }
        Ok(self.ctx.store.list_quotes(&filter).await?)
    }

    /// Status decision and/or record-keeping edits.
    ///
    /// Approval needs an estimated price, either already stored or supplied in
    /// the same update. Approved and rejected are final for status; price and
    /// staff notes stay editable. Requesting the current status is a no-op.
    pub async fn update(
        &self,
        id: QuoteId,
        actor: &Actor,
        update: QuoteUpdate,
    ) -> WorkflowResult<Quote> {
        // The decision being attempted is what a refusal should name
        if let Some(action) = update.status.and_then(Action::for_quote_status) {
            authorize(actor, action)?;
        }
        authorize(actor, Action::AmendQuote)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self.ctx.load_quote(id).await?;

            let status_change = match update.status {
                Some(status) if status != current.status => {
                    if !current.status.can_transition_to(status) {
                        return Err(WorkflowError::InvalidTransition {
                            entity: QuoteStatus::ENTITY,
                            from: current.status.as_str(),
                            to: status.as_str(),
                        });
                    }
                    Some(status)
                }
                _ => None,
            };

            let mut next = current.next_version(Utc::now());
            if let Some(price) = update.estimated_price {
                next.estimated_price = Some(price);
            }
            if let Some(notes) = &update.staff_notes {
                next.staff_notes = Some(notes.clone());
            }
            if status_change == Some(QuoteStatus::Approved) && next.estimated_price.is_none() {
                return Err(WorkflowError::FieldRequired {
                    field: "estimated_price",
                    operation: "approval",
                });
            }
            if let Some(status) = status_change {
                next.status = status;
            }

            let unchanged = status_change.is_none()
                && next.estimated_price == current.estimated_price
                && next.staff_notes == current.staff_notes;
            if unchanged {
                return Ok(current);
            }

            match self
                .ctx
                .store
                .apply(vec![ConditionalWrite::update_quote(next.clone(), current.version)])
                .await
            {
                Ok(()) => {}
                Err(e) if self.ctx.should_retry(&e, attempt) => {
                    warn!(quote_id = %id, attempt, "Quote changed during update, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(status) = status_change {
                self.ctx.metrics.record_transition();
                info!(
                    quote_id = %id,
                    actor_id = %actor.id,
                    from = %current.status,
                    to = %status,
                    "Quote status changed"
                );
                self.ctx.notifier.publish(WorkflowEvent::QuoteStatusChanged {
                    quote_id: id,
                    status,
                    requester: next.requester.clone(),
                });
            } else {
                info!(quote_id = %id, actor_id = %actor.id, "Quote amended");
            }
            return Ok(next);
        }
    }

    pub async fn approve(&self, id: QuoteId, actor: &Actor) -> WorkflowResult<Quote> {
        self.update(
            id,
            actor,
            QuoteUpdate {
                status: Some(QuoteStatus::Approved),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn reject(&self, id: QuoteId, actor: &Actor) -> WorkflowResult<Quote> {
        self.update(
            id,
            actor,
            QuoteUpdate {
                status: Some(QuoteStatus::Rejected),
                ..Default::default()
            },
        )
        .await
    }
}
