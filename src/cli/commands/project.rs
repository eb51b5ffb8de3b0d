use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;

use super::{print_json, Command};
use crate::catalog::ProjectStatus;
use crate::engine::WorkflowEngine;
use crate::model::{
    ActorId, Money, ProjectAmendment, ProjectDraft, ProjectFilter, ProjectId, QuoteId,
};
use crate::policy::Actor;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project directly (support/admin)
    Create {
        #[arg(long, help = "Customer the work is for")]
        customer: String,
        #[arg(long)]
        service: String,
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, help = "Approved quote this project fulfils")]
        quote: Option<QuoteId>,
        #[arg(long, help = "RFC 3339 timestamp, e.g. 2026-11-02T09:00:00Z")]
        scheduled: Option<DateTime<Utc>>,
    },
    /// List projects visible to the caller
    List {
        #[arg(long)]
        status: Option<ProjectStatus>,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        technician: Option<String>,
        #[arg(long, conflicts_with = "status", help = "Only projects still open for claiming")]
        claimable: bool,
    },
    /// Show one project
    Show { project: ProjectId },
    /// Accept a pending project (first claim wins)
    Claim { project: ProjectId },
    /// Move a project to its next status, or to --to
    Advance {
        project: ProjectId,
        #[arg(long, help = "Target status; defaults to the next step")]
        to: Option<ProjectStatus>,
    },
    /// Cancel a project (final)
    Cancel { project: ProjectId },
    /// Record price, schedule or technician notes
    Amend {
        project: ProjectId,
        #[arg(long)]
        price: Option<Money>,
        #[arg(long)]
        scheduled: Option<DateTime<Utc>>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Rate a completed project, once (owning customer)
    Rate {
        project: ProjectId,
        #[arg(long, help = "1 to 5")]
        stars: u8,
        #[arg(long)]
        review: Option<String>,
    },
}

impl Command for ProjectCommands {
    async fn execute(&self, engine: &WorkflowEngine, actor: &Actor) -> Result<()> {
        let projects = engine.projects();
        match self {
            ProjectCommands::Create {
                customer,
                service,
                location,
                notes,
                quote,
                scheduled,
            } => {
                let draft = ProjectDraft {
                    quote_id: *quote,
                    customer: ActorId::from(customer.as_str()),
                    service: service.clone(),
                    location: location.clone(),
                    notes: notes.clone(),
                    scheduled_date: *scheduled,
                };
                print_json(&projects.create(actor, draft).await?)
            }
            ProjectCommands::List {
                status,
                customer,
                technician,
                claimable,
            } => {
                let mut filter = if *claimable {
                    ProjectFilter::claimable()
                } else {
                    ProjectFilter {
                        status: *status,
                        ..Default::default()
                    }
                };
                filter.customer = customer.as_deref().map(ActorId::from);
                filter.technician = technician.as_deref().map(ActorId::from);
                print_json(&projects.list(actor, filter).await?)
            }
            ProjectCommands::Show { project } => print_json(&projects.get(actor, *project).await?),
            ProjectCommands::Claim { project } => {
                print_json(&projects.claim(*project, actor).await?)
            }
            ProjectCommands::Advance { project, to } => {
                let project = match to {
                    Some(status) => projects.transition(*project, actor, *status).await?,
                    None => projects.advance(*project, actor).await?,
                };
                print_json(&project)
            }
            ProjectCommands::Cancel { project } => {
                print_json(&projects.cancel(*project, actor).await?)
            }
            ProjectCommands::Amend {
                project,
                price,
                scheduled,
                notes,
            } => {
                let amendment = ProjectAmendment {
                    final_price: *price,
                    scheduled_date: *scheduled,
                    technician_notes: notes.clone(),
                };
                print_json(&projects.amend(*project, actor, amendment).await?)
            }
            ProjectCommands::Rate {
                project,
                stars,
                review,
            } => print_json(&projects.rate(*project, actor, *stars, review.clone()).await?),
        }
    }
}
