//! Concurrent cancellation of stale workflow runs.

use crate::client::QueryTransport;
use crate::error::CancelError;
use crate::query;
use crate::transit;
use crate::workflow::WorkflowRecord;

use futures::future::join_all;

/// Outcome of a batch of cancellations.
#[derive(Debug, Default)]
pub struct CancelReport {
    /// Ids of runs whose cancel request went through.
    pub canceled: Vec<String>,
    pub failed: Vec<CancelError>,
}

impl CancelReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Send one cancel-run command. Any successful reply counts, whatever its body.
pub async fn cancel_run<T: QueryTransport>(
    transport: &T,
    record: &WorkflowRecord,
) -> Result<(), CancelError> {
    let attempt = async {
        let command = query::cancel_command(record)?;
        transport.send(transit::encode(&command)).await?;
        crate::Result::Ok(())
    };

    attempt.await.map_err(|cause| CancelError {
        id: record.id.clone(),
        cause,
    })
}

/// Cancel every target concurrently and wait for all of them to settle.
///
/// A failed request is recorded and does not stop the others.
pub async fn cancel_runs<T: QueryTransport>(
    transport: &T,
    targets: &[&WorkflowRecord],
) -> CancelReport {
    let outcomes = join_all(targets.iter().map(|record| async move {
        let outcome = cancel_run(transport, record).await;
        (record.id.clone(), outcome)
    }))
    .await;

    let mut report = CancelReport::default();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                tracing::info!(workflow_id = %id, "canceled stale workflow run");
                report.canceled.push(id);
            }
            Err(error) => {
                tracing::warn!(workflow_id = %id, cause = %error.cause, "failed to cancel workflow run");
                report.failed.push(error);
            }
        }
    }
    report
}
