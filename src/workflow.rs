//! Workflow run records extracted from query API responses.

use crate::error::{ExtractError, Result};
use crate::transit::lookup::{map_field, seq_field, str_field, timestamp_field, uuid_field};
use crate::transit::{TransitMap, Value};

use chrono::{DateTime, Utc};

/// Lifecycle state of a workflow run as reported by the query API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowStatus {
    Success,
    Canceled,
    Blocked,
    Running,
    Failed,
}

impl WorkflowStatus {
    /// Runs that have not reached a terminal state and can still be aborted.
    pub fn is_cancelable(self) -> bool {
        matches!(self, Self::Running | Self::Blocked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Canceled => "canceled",
            Self::Blocked => "blocked",
            Self::Running => "running",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = ExtractError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "success" => Ok(Self::Success),
            "canceled" => Ok(Self::Canceled),
            "blocked" => Ok(Self::Blocked),
            "running" => Ok(Self::Running),
            "failed" => Ok(Self::Failed),
            other => Err(ExtractError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One workflow run, flattened out of its Transit map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRecord {
    /// Canonical hyphenated UUID.
    pub id: String,
    pub status: WorkflowStatus,
    pub commit_sha: String,
    pub branch_name: String,
    pub workflow_name: String,
    pub created_at: DateTime<Utc>,
}

/// Build a record from a single `workflow/*` map. Every field is required.
pub fn extract(entry: &TransitMap) -> std::result::Result<WorkflowRecord, ExtractError> {
    let created_at = timestamp_field(entry, "workflow/created-at")?;
    let status = str_field(entry, "workflow/status")?.parse()?;
    let workflow_name = str_field(entry, "workflow/name")?.to_string();
    let id = uuid_field(entry, "workflow/id")?.to_string();

    let trigger_info = map_field(entry, "workflow/trigger-info")?;
    let commit_sha = str_field(trigger_info, "trigger-info/vcs-revision")?.to_string();
    let branch_name = str_field(trigger_info, "trigger-info/branch")?.to_string();

    Ok(WorkflowRecord {
        id,
        status,
        commit_sha,
        branch_name,
        workflow_name,
        created_at,
    })
}

/// Extract every entry under the response's `results` key.
///
/// One bad entry fails the whole batch: picking the current build needs the
/// complete list.
pub fn extract_results(response: &Value) -> Result<Vec<WorkflowRecord>> {
    let response = response.as_map().ok_or_else(|| ExtractError::UnexpectedType {
        name: "response".into(),
        expected: "map",
    })?;

    let records = seq_field(response, "results")?
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry = entry.as_map().ok_or_else(|| ExtractError::UnexpectedType {
                name: format!("results[{index}]"),
                expected: "map",
            })?;
            extract(entry)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}
