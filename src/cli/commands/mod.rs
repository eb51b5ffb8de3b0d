use anyhow::Result;
use serde::Serialize;

use crate::catalog;
use crate::cli::Commands;
use crate::engine::WorkflowEngine;
use crate::policy::Actor;

pub mod project;
pub mod quote;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, engine: &WorkflowEngine, actor: &Actor) -> Result<()>;
}

/// Every command answers with the engine's canonical record
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Command for Commands {
    async fn execute(&self, engine: &WorkflowEngine, actor: &Actor) -> Result<()> {
        match self {
            Commands::Quote { action } => action.execute(engine, actor).await,
            Commands::Promote { quote } => {
                let promotion = engine.promotions().promote(*quote, actor).await?;
                print_json(&promotion)
            }
            Commands::Project { action } => action.execute(engine, actor).await,
            Commands::Catalog => print_json(&catalog::catalog()),
        }
    }
}
