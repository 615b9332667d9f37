//! supersede: cancel CircleCI workflow runs made obsolete by a newer build on
//! the same branch.

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod selection;
pub mod transit;
pub mod workflow;

pub use cancel::CancelReport;
pub use client::{Credential, HttpTransport, QueryTransport};
pub use config::Config;
pub use error::{Error, Result};
pub use selection::{RunOrder, Selection};
pub use workflow::{WorkflowRecord, WorkflowStatus};

use error::ConfigError;

/// Fetch one page of the project's workflow runs.
pub async fn fetch_workflows<T: QueryTransport>(
    transport: &T,
    config: &Config,
) -> Result<Vec<WorkflowRecord>> {
    let query = query::list_workflows_query(
        &config.organization,
        &config.project,
        config.page,
        config.vcs_type,
    );
    let response = client::exchange(transport, &query).await?;
    workflow::extract_results(&response)
}

/// Fetch the branch's history and pick the runs to cancel, without
/// cancelling anything.
pub async fn plan<T: QueryTransport>(transport: &T, config: &Config) -> Result<Selection> {
    let records = fetch_workflows(transport, config).await?;
    tracing::debug!(count = records.len(), "fetched workflow runs");

    let selection = selection::select(records, &config.branch, config.ordering)?;
    tracing::info!(
        branch = %config.branch,
        current = %selection.current.id,
        commit = %selection.current.commit_sha,
        stale = selection.stale.len(),
        "identified current build"
    );
    Ok(selection)
}

/// Cancel every stale running or blocked run on the configured branch.
pub async fn run<T: QueryTransport>(transport: &T, config: &Config) -> Result<CancelReport> {
    let selection = plan(transport, config).await?;
    let targets = selection.to_cancel();
    if targets.is_empty() {
        tracing::info!(branch = %config.branch, "no superseded runs to cancel");
    }
    Ok(cancel::cancel_runs(transport, &targets).await)
}

fn http_transport(config: &Config, credential: Option<&str>) -> Result<HttpTransport> {
    config.validate()?;
    let credential = credential
        .and_then(Credential::new)
        .ok_or(ConfigError::MissingCredential)?;
    Ok(HttpTransport::new(config, &credential)?)
}

/// Entry point: talk to the real query API using the caller's session cookie.
pub async fn cancel_superseded(config: &Config, credential: Option<&str>) -> Result<CancelReport> {
    let transport = http_transport(config, credential)?;
    run(&transport, config).await
}

/// Dry-run entry point: like [`cancel_superseded`] but stops after selection.
pub async fn plan_superseded(config: &Config, credential: Option<&str>) -> Result<Selection> {
    let transport = http_transport(config, credential)?;
    plan(&transport, config).await
}
