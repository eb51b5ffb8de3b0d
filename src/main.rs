use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use fieldflow::cli::commands::Command;
use fieldflow::cli::Cli;
use fieldflow::config::{FieldflowConfig, SinkKind};
use fieldflow::notify::sinks::{LogSink, NullSink};
use fieldflow::notify::NotificationSink;
use fieldflow::{init_telemetry, open_store, EngineSettings, WorkflowEngine, WorkflowError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<WorkflowError>() {
                Some(workflow) => eprintln!("error[{}]: {workflow}", workflow.kind().code()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    FieldflowConfig::load_env_file()?;
    let config = FieldflowConfig::load_from(&cli.config)?;
    init_telemetry(&config.observability)?;

    let store = open_store(&config.storage).await?;
    let sink: Arc<dyn NotificationSink> = match config.notifications.sink {
        SinkKind::Log => Arc::new(LogSink),
        SinkKind::None => Arc::new(NullSink),
    };
    let engine = WorkflowEngine::new(store, sink, EngineSettings::from(&config.engine));

    let actor = cli.actor();
    let result = cli.command.execute(&engine, &actor).await;
    engine.metrics().log_stats();
    result
}
