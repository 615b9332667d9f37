//! supersede CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use supersede::{Config, RunOrder};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "supersede")]
#[command(about = "Cancel CircleCI workflow runs superseded by a newer build on the same branch")]
struct Cli {
    /// Session cookie for the CircleCI query API
    #[arg(long, env = "CIRCLE_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Only report which runs would be canceled
    #[arg(long)]
    dry_run: bool,

    /// Pick the current build by creation time instead of API order
    #[arg(long)]
    sort_by_created_at: bool,

    /// Number of recent workflow runs to inspect
    #[arg(long)]
    limit: Option<i64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load().context("failed to load configuration from environment")?;
    if cli.sort_by_created_at {
        config.ordering = RunOrder::NewestCreatedFirst;
    }
    if let Some(limit) = cli.limit {
        config.page.limit = limit;
    }
    config.validate().context("invalid configuration")?;

    tracing::info!(
        organization = %config.organization,
        project = %config.project,
        branch = %config.branch,
        "looking for superseded workflow runs"
    );

    if cli.dry_run {
        let selection = supersede::plan_superseded(&config, cli.cookie.as_deref())
            .await
            .context("failed to plan superseded workflow runs")?;
        for record in selection.to_cancel() {
            tracing::info!(
                workflow_id = %record.id,
                workflow = %record.workflow_name,
                status = %record.status,
                commit = %record.commit_sha,
                "would cancel"
            );
        }
        return Ok(());
    }

    let report = supersede::cancel_superseded(&config, cli.cookie.as_deref())
        .await
        .context("failed to cancel superseded workflow runs")?;

    for failure in &report.failed {
        tracing::warn!(workflow_id = %failure.id, error = %failure.cause, "workflow run left running");
    }
    tracing::info!(
        canceled = report.canceled.len(),
        failed = report.failed.len(),
        "finished"
    );

    Ok(())
}
