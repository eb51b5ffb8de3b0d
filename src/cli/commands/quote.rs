use anyhow::Result;
use clap::Subcommand;

use super::{print_json, Command};
use crate::catalog::QuoteStatus;
use crate::engine::WorkflowEngine;
use crate::model::{ActorId, Money, QuoteDraft, QuoteFilter, QuoteId, QuoteUpdate};
use crate::policy::Actor;

#[derive(Subcommand)]
pub enum QuoteCommands {
    /// Ask for a priced estimate (customers)
    Request {
        #[arg(long, help = "Service requested, e.g. 'roof inspection'")]
        service: String,
        #[arg(long, help = "Where the work happens")]
        location: String,
        #[arg(long, default_value = "", help = "Free-form details for the estimator")]
        notes: String,
    },
    /// Price, approve or reject a quote (support/admin)
    Review {
        quote: QuoteId,
        #[arg(long, conflicts_with = "reject", help = "Approve the quote")]
        approve: bool,
        #[arg(long, help = "Reject the quote")]
        reject: bool,
        #[arg(long, help = "Estimated price, e.g. 500 or 499.99")]
        price: Option<Money>,
        #[arg(long, help = "Staff notes kept on the quote")]
        notes: Option<String>,
    },
    /// Show one quote
    Show { quote: QuoteId },
    /// List quotes visible to the caller
    List {
        #[arg(long, help = "Only quotes in this status")]
        status: Option<QuoteStatus>,
        #[arg(long, help = "Only quotes requested by this actor")]
        requester: Option<String>,
    },
}

impl Command for QuoteCommands {
    async fn execute(&self, engine: &WorkflowEngine, actor: &Actor) -> Result<()> {
        match self {
            QuoteCommands::Request { service, location, notes } => {
                let draft = QuoteDraft {
                    service: service.clone(),
                    location: location.clone(),
                    notes: notes.clone(),
                };
                print_json(&engine.quotes().create(actor, draft).await?)
            }
            QuoteCommands::Review {
                quote,
                approve,
                reject,
                price,
                notes,
            } => {
                let status = match (approve, reject) {
                    (true, _) => Some(QuoteStatus::Approved),
                    (_, true) => Some(QuoteStatus::Rejected),
                    _ => None,
                };
                let update = QuoteUpdate {
                    status,
                    estimated_price: *price,
                    staff_notes: notes.clone(),
                };
                if update.is_empty() {
                    anyhow::bail!(
                        "nothing to change: pass --approve, --reject, --price or --notes"
                    );
                }
                print_json(&engine.quotes().update(*quote, actor, update).await?)
            }
            QuoteCommands::Show { quote } => print_json(&engine.quotes().get(actor, *quote).await?),
            QuoteCommands::List { status, requester } => {
                let filter = QuoteFilter {
                    status: *status,
                    requester: requester.as_deref().map(ActorId::from),
                };
                print_json(&engine.quotes().list(actor, filter).await?)
            }
        }
    }
}
