//! Picking the current build and the stale runs to cancel.

use crate::error::SelectionError;
use crate::workflow::WorkflowRecord;

/// Order in which a branch's runs are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunOrder {
    /// Trust the query API, which lists newest runs first.
    #[default]
    AsReturned,
    /// Re-sort by creation time, newest first. Ties keep the API's order.
    NewestCreatedFirst,
}

/// A branch's history split around the build that is running now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Newest run on the branch; never canceled.
    pub current: WorkflowRecord,
    /// Every older run on the branch, whatever its status.
    pub stale: Vec<WorkflowRecord>,
}

impl Selection {
    /// Stale runs that are still running or blocked.
    pub fn to_cancel(&self) -> Vec<&WorkflowRecord> {
        self.stale
            .iter()
            .filter(|record| record.status.is_cancelable())
            .collect()
    }
}

/// Split `records` into the current build and older runs on `active_branch`.
///
/// With [`RunOrder::AsReturned`] the first matching record is taken as the
/// current build. That relies on the query API returning runs newest-first;
/// nothing here checks it.
pub fn select(
    records: Vec<WorkflowRecord>,
    active_branch: &str,
    order: RunOrder,
) -> Result<Selection, SelectionError> {
    let mut on_branch: Vec<WorkflowRecord> = records
        .into_iter()
        .filter(|record| record.branch_name == active_branch)
        .collect();

    if order == RunOrder::NewestCreatedFirst {
        on_branch.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    let mut runs = on_branch.into_iter();
    let current = runs.next().ok_or_else(|| SelectionError::NoMatchingBuild {
        branch: active_branch.to_string(),
    })?;

    Ok(Selection {
        current,
        stale: runs.collect(),
    })
}
