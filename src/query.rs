//! Request payloads for the query API.

use crate::error::{Result, TransitError};
use crate::transit::{self, TransitMap, Value};
use crate::workflow::WorkflowRecord;

use uuid::Uuid;

/// Cancel-run RPC with both argument slots empty. The server defines the key
/// identities here; commands are built by filling the slots, never by
/// constructing new keys.
const CANCEL_TEMPLATE: &str = r#"["~#list",["~$run/cancel",["^ ","~:run/id","","~:run/name",""]]]"#;

const RUN_ID_SLOT: usize = 0;
const RUN_NAME_SLOT: usize = 1;

/// Source control provider a project is hosted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VcsType {
    #[default]
    Github,
    Bitbucket,
}

impl VcsType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Bitbucket => "bitbucket",
        }
    }
}

impl std::str::FromStr for VcsType {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "github" | "gh" => Ok(Self::Github),
            "bitbucket" | "bb" => Ok(Self::Bitbucket),
            other => Err(format!("unsupported VCS type: {other}")),
        }
    }
}

/// Window into a project's workflow history. Only one page is ever fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 30,
        }
    }
}

/// `get-project-workflows` request for one project.
pub fn list_workflows_query(organization: &str, project: &str, page: Page, vcs: VcsType) -> Value {
    let opts = TransitMap::new()
        .with("offset", page.offset)
        .with("limit", page.limit);

    let params = TransitMap::new()
        .with("organization/vcs-type", Value::keyword(vcs.as_str()))
        .with("organization/name", organization)
        .with("project/name", project)
        .with("opts", opts);

    Value::Map(
        TransitMap::new()
            .with("type", Value::keyword("get-project-workflows"))
            .with("params", params),
    )
}

/// Fresh copy of the cancel-run command with empty argument slots.
pub fn cancel_template() -> std::result::Result<Value, TransitError> {
    transit::decode(CANCEL_TEMPLATE)
}

/// Argument map inside the template's `(run/cancel {...})` list.
fn command_arguments(command: &mut Value) -> std::result::Result<&mut TransitMap, TransitError> {
    command
        .as_seq_mut()
        .and_then(|items| items.get_mut(1))
        .and_then(Value::as_map_mut)
        .ok_or_else(|| TransitError::malformed("cancel template has no argument map"))
}

/// Cancel-run command for one workflow run.
///
/// Only the values of the template's `run/id` and `run/name` entries are
/// replaced; the key values themselves come from the template untouched.
pub fn cancel_command(record: &WorkflowRecord) -> Result<Value> {
    let run_id = Uuid::parse_str(&record.id).map_err(|error| {
        anyhow::anyhow!("workflow id {:?} is not a UUID: {error}", record.id)
    })?;

    let mut command = cancel_template()?;
    let arguments = command_arguments(&mut command)?;

    for (slot, value) in [
        (RUN_ID_SLOT, Value::Uuid(run_id)),
        (RUN_NAME_SLOT, Value::string(record.workflow_name.clone())),
    ] {
        let (_, current) = arguments
            .entry_at_mut(slot)
            .ok_or_else(|| TransitError::malformed(format!("cancel template has no slot {slot}")))?;
        *current = value;
    }

    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowStatus;

    use chrono::Utc;

    fn record(id: &str, name: &str) -> WorkflowRecord {
        WorkflowRecord {
            id: id.into(),
            status: WorkflowStatus::Running,
            commit_sha: "abc123".into(),
            branch_name: "main".into(),
            workflow_name: name.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_list_workflows_query_wire_shape() {
        let query = list_workflows_query("acme", "widgets", Page::default(), VcsType::Github);

        assert_eq!(
            transit::encode(&query),
            r#"["^ ","~:type","~:get-project-workflows","~:params",["^ ","~:organization/vcs-type","~:github","~:organization/name","acme","~:project/name","widgets","~:opts",["^ ","~:offset",0,"~:limit",30]]]"#
        );
    }

    #[test]
    fn test_cancel_command_wire_shape() {
        let command = cancel_command(&record("5e3dc3c2-7f7c-4b1b-9d0a-1f2c3b4a5d6e", "deploy")).unwrap();

        assert_eq!(
            transit::encode(&command),
            r#"["~#list",["~$run/cancel",["^ ","~:run/id","~u5e3dc3c2-7f7c-4b1b-9d0a-1f2c3b4a5d6e","~:run/name","deploy"]]]"#
        );
    }

    #[test]
    fn test_cancel_command_keeps_template_keys() {
        let template = cancel_template().unwrap();
        let template_keys: Vec<Value> = template.as_seq().unwrap()[1]
            .as_map()
            .unwrap()
            .keys()
            .cloned()
            .collect();

        for name in ["", "~tricky", "build and test"] {
            let command = cancel_command(&record("00000000-0000-0000-0000-000000000001", name)).unwrap();
            let arguments = command.as_seq().unwrap()[1].as_map().unwrap();
            let keys: Vec<Value> = arguments.keys().cloned().collect();
            assert_eq!(keys, template_keys);

            let encoded = transit::encode(&command);
            assert!(encoded.contains(r#""~:run/id","~u00000000-0000-0000-0000-000000000001""#));
            assert!(encoded.contains(r#""~:run/name","#));
        }
    }

    #[test]
    fn test_cancel_command_rejects_non_uuid_id() {
        assert!(cancel_command(&record("not-a-uuid", "deploy")).is_err());
    }

    #[test]
    fn test_vcs_type_parsing() {
        assert_eq!("GitHub".parse::<VcsType>(), Ok(VcsType::Github));
        assert_eq!("bitbucket".parse::<VcsType>(), Ok(VcsType::Bitbucket));
        assert!("gitlab".parse::<VcsType>().is_err());
    }
}
