//! Stagehand demo runner.
//!
//! Registers the built-in pipelines (plus any catalog named by the config),
//! triggers one pipeline, waits for it to finish and prints the execution as
//! JSON.

use anyhow::{Context, Result};
use clap::Parser;
use stagehand::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FORMAT_ENV: &str = "STAGEHAND_LOG_FORMAT";

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(author, version, about = "Simulated CI/CD pipeline executor", long_about = None)]
struct Cli {
    /// Pipeline id to trigger.
    #[arg(default_value = "development")]
    pipeline: String,

    /// Branch recorded on the execution.
    #[arg(short, long, default_value = "main")]
    branch: String,

    /// Commit recorded on the execution.
    #[arg(short, long, default_value = "0000000000000000")]
    commit: String,

    /// Author recorded on the execution.
    #[arg(short, long, env = "USER")]
    author: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(short, long, default_value_t = false)]
    pretty: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = RunnerConfig::from_env().context("Failed to load runner configuration")?;
    let pipelines_file = config.pipelines_file.clone();
    let service = PipelineService::new(config).with_default_pipelines();

    if let Some(path) = pipelines_file {
        let count = service
            .register_from_file(&path)
            .with_context(|| format!("Failed to load pipelines from {path}"))?;
        info!(path = %path, count, "Registered pipelines from catalog");
    }

    let mut context = TriggerContext::new(&cli.branch, &cli.commit, "manual");
    if let Some(author) = &cli.author {
        context = context.with_author(author);
    }

    let id = service
        .trigger(&cli.pipeline, context)
        .with_context(|| format!("Failed to trigger pipeline '{}'", cli.pipeline))?;
    info!(execution_id = %id, "Waiting for execution to finish");

    let execution = service.wait_for_completion(&id).await?;
    let output = if cli.pretty {
        serde_json::to_string_pretty(&execution)?
    } else {
        serde_json::to_string(&execution)?
    };
    println!("{output}");

    if execution.status != ExecutionStatus::Success {
        anyhow::bail!("Execution {id} finished with status {}", execution.status);
    }
    Ok(())
}
