use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::QuoteId;
use crate::policy::{Actor, ActorRole};

pub mod commands;

pub use commands::project::ProjectCommands;
pub use commands::quote::QuoteCommands;

#[derive(Parser)]
#[command(name = "fieldflow")]
#[command(about = "Quote and project workflow engine for field-service teams")]
#[command(long_about = "Fieldflow runs the quote -> project workflow: customers request quotes, \
                       support prices and approves them, customers promote approved quotes into \
                       projects, and field staff claim and carry projects to completion. \
                       Every command prints the canonical record as JSON.")]
pub struct Cli {
    /// Identity of the caller, as supplied by the identity provider
    #[arg(long, global = true, default_value = "cli", help = "Actor id the command runs as")]
    pub actor: String,
    /// Role of the caller
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "customer",
        help = "Role the command runs as"
    )]
    pub role: ActorRole,
    /// Configuration file
    #[arg(long, global = true, default_value = "fieldflow.toml", help = "Path to fieldflow.toml")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn actor(&self) -> Actor {
        Actor::new(self.actor.as_str(), self.role)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Request, review and inspect quotes
    Quote {
        #[command(subcommand)]
        action: QuoteCommands,
    },
    /// Turn an approved quote into a project (safe to repeat)
    Promote {
        /// Quote to promote
        quote: QuoteId,
    },
    /// Create, claim, advance and rate projects
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// Print the shared status catalog
    Catalog,
}
