use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod fetcher;
mod github;
mod merger;
mod model;
mod models;
mod outputs;
mod pipeline;
mod publisher;
mod summarizer;

use config::Config;
use error::RunError;
use outputs::Outputs;
use pipeline::RunOutcome;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let outputs = Outputs::from_env();

    let result = match Config::from_env() {
        Ok(config) => {
            tracing::debug!("Loaded configuration: {:?}", config);
            pipeline::run(&config).await
        }
        Err(e) => Err(RunError::from(e)),
    };

    if let Err(e) = conclude(&outputs, result) {
        tracing::error!("Changelog update failed: {}", e);
        outputs.fail(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

/// Report the run's outputs. Any error here, including a failed output write, fails the run.
fn conclude(outputs: &Outputs, result: Result<RunOutcome, RunError>) -> Result<()> {
    report(outputs, result?)
}

fn report(outputs: &Outputs, outcome: RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::NoCommits | RunOutcome::UpToDate => {
            outputs.set("changelog_updated", "false")?;
        }
        RunOutcome::Published(pr) => {
            tracing::info!("Changelog pull request ready: {}", pr.html_url);
            outputs.set("changelog_updated", "true")?;
            outputs.set("pr_number", &pr.number.to_string())?;
            outputs.set("pr_url", &pr.html_url)?;
        }
    }
    Ok(())
}
