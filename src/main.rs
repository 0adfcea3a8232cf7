//! shipwright binary: one workflow run per invocation

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use shipwright::cli::Cli;
use shipwright::orchestrator::DockerBuildStreamer;
use shipwright::startup::{StartupContext, initialize_tracing};
use shipwright::{AgentRuntime, EventSink, WorkflowRequest, WorkflowSettings};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env (non-fatal if missing)
    dotenvy::dotenv().ok();

    let args = Cli::parse();
    let startup = StartupContext::from_cli_args(&args)?;
    initialize_tracing(&startup.config.debug);
    if let Some(path) = &startup.config_path {
        tracing::debug!(path = %path.display(), "Using configuration file");
    }

    let prompt = args.prompt_text()?;
    let config = &startup.config;
    let settings = WorkflowSettings::from_config(config)?;
    let builder = Arc::new(DockerBuildStreamer::new(&config.image.builder));

    let runtime = AgentRuntime::launch(&config.agent).await?;
    let sequencer = runtime.sequencer(settings, builder);

    let (events, mut receiver) = EventSink::channel(config.workflow.author.as_str());
    let printer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            println!("{}", event.text);
        }
    });

    let outcome = sequencer.run(WorkflowRequest::new(prompt), &events).await;
    drop(events);
    if let Err(err) = printer.await {
        tracing::warn!(error = %err, "event printer stopped unexpectedly");
    }

    if let Err(err) = runtime.shutdown().await {
        tracing::warn!(error = %format!("{err:#}"), "agent shutdown was not clean");
    }

    Ok(if outcome.is_done() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
