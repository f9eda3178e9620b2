//! Built-in `Tool` implementations wrapping the exec/process/file-op
//! functions for use behind a [`ToolPipeline`](crate::pipeline::ToolPipeline).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use sagent_skills::{activate, deactivate, ActivatedSkill, SkillPermissions, SkillsRegistry};

use crate::error::{Error, Result};
use crate::file_ops::{
    file_append, file_delete, file_list, file_move, file_read, file_write, FileAppendRequest,
    FileDeleteRequest, FileListRequest, FileMoveRequest, FileReadRequest, FileWriteRequest,
};
use crate::manager::ProcessManager;
use crate::pipeline::{Tool, ToolOutcome};
use crate::process::{handle_process, ProcessRequest};

fn to_tool_err(tool: &str, cause: impl std::fmt::Display) -> Error {
    Error::ToolExecutionFailed {
        tool: tool.to_string(),
        cause: cause.to_string(),
    }
}

fn outcome_from_value(value: Value) -> ToolOutcome {
    ToolOutcome::ok(serde_json::to_string(&value).unwrap_or_default())
}

/// Runs a shell command via `sagent-tools::exec`, foreground or backgrounded.
pub struct ExecTool {
    manager: Arc<ProcessManager>,
}

impl ExecTool {
    pub fn new(manager: Arc<ProcessManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "Bash"
    }

    fn description(&self) -> &str {
        "Runs a shell command, foreground or backgrounded."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "background": {"type": "boolean"},
                "yield_ms": {"type": "integer"},
                "timeout_sec": {"type": "integer"},
                "workdir": {"type": "string"},
            },
            "required": ["command"],
        })
    }

    fn spawns_subprocess(&self) -> bool {
        true
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutcome> {
        let req = serde_json::from_value(arguments).map_err(|e| to_tool_err(self.name(), e))?;
        let resp = crate::exec::exec(&self.manager, req).await;
        Ok(outcome_from_value(
            serde_json::to_value(resp).unwrap_or_default(),
        ))
    }
}

/// Manages background process sessions created by [`ExecTool`].
pub struct ProcessTool {
    manager: Arc<ProcessManager>,
}

impl ProcessTool {
    pub fn new(manager: Arc<ProcessManager>) -> Self {
        Self { manager }
    }
}

#[async_trait::async_trait]
impl Tool for ProcessTool {
    fn name(&self) -> &str {
        "Process"
    }

    fn description(&self) -> &str {
        "Lists, polls, or controls background process sessions."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["list", "poll", "log", "write", "kill", "clear", "remove"]},
                "session_id": {"type": "string"},
            },
            "required": ["action"],
        })
    }

    fn primary_arg(&self, arguments: &Value) -> Option<String> {
        arguments
            .get("session_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutcome> {
        let req: ProcessRequest =
            serde_json::from_value(arguments).map_err(|e| to_tool_err(self.name(), e))?;
        let resp = handle_process(&self.manager, req).await;
        if !resp.success {
            return Ok(ToolOutcome::error(
                resp.error.unwrap_or_else(|| "process action failed".to_string()),
            ));
        }
        Ok(outcome_from_value(serde_json::to_value(resp).unwrap_or_default()))
    }
}

macro_rules! file_tool {
    ($ty:ident, $tool_name:literal, $desc:literal, $req:ty, $func:ident) => {
        pub struct $ty {
            workspace_root: PathBuf,
        }

        impl $ty {
            pub fn new(workspace_root: PathBuf) -> Self {
                Self { workspace_root }
            }
        }

        #[async_trait::async_trait]
        impl Tool for $ty {
            fn name(&self) -> &str {
                $tool_name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn parameters_schema(&self) -> Value {
                serde_json::json!({"type": "object"})
            }

            async fn invoke(&self, arguments: Value) -> Result<ToolOutcome> {
                let req: $req =
                    serde_json::from_value(arguments).map_err(|e| to_tool_err(self.name(), e))?;
                match $func(&self.workspace_root, req).await {
                    Ok(value) => Ok(outcome_from_value(value)),
                    Err(msg) => Ok(ToolOutcome::error(msg)),
                }
            }
        }
    };
}

file_tool!(ReadTool, "Read", "Reads a file under the workspace root.", FileReadRequest, file_read);
file_tool!(WriteTool, "Write", "Writes a file under the workspace root.", FileWriteRequest, file_write);
file_tool!(
    AppendTool,
    "Append",
    "Appends to a file under the workspace root.",
    FileAppendRequest,
    file_append
);
file_tool!(DeleteTool, "Delete", "Deletes a file under the workspace root.", FileDeleteRequest, file_delete);
file_tool!(ListTool, "List", "Lists a directory under the workspace root.", FileListRequest, file_list);

/// `move`/`rename` takes two paths; its primary arg is the destination,
/// matching `Write`-style path permission patterns.
pub struct MoveTool {
    workspace_root: PathBuf,
}

impl MoveTool {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self { workspace_root }
    }
}

#[async_trait::async_trait]
impl Tool for MoveTool {
    fn name(&self) -> &str {
        "Move"
    }

    fn description(&self) -> &str {
        "Moves or renames a file under the workspace root."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"source": {"type": "string"}, "destination": {"type": "string"}},
            "required": ["source", "destination"],
        })
    }

    fn primary_arg(&self, arguments: &Value) -> Option<String> {
        arguments
            .get("destination")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutcome> {
        let req: FileMoveRequest =
            serde_json::from_value(arguments).map_err(|e| to_tool_err(self.name(), e))?;
        match file_move(&self.workspace_root, req).await {
            Ok(value) => Ok(outcome_from_value(value)),
            Err(msg) => Ok(ToolOutcome::error(msg)),
        }
    }
}

/// Builds the standard built-in tool set rooted at `workspace_root`, sharing
/// one [`ProcessManager`] between the exec and process tools.
pub fn standard_tools(
    workspace_root: PathBuf,
    manager: Arc<ProcessManager>,
) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ExecTool::new(manager.clone())),
        Arc::new(ProcessTool::new(manager)),
        Arc::new(ReadTool::new(workspace_root.clone())),
        Arc::new(WriteTool::new(workspace_root.clone())),
        Arc::new(AppendTool::new(workspace_root.clone())),
        Arc::new(DeleteTool::new(workspace_root.clone())),
        Arc::new(ListTool::new(workspace_root.clone())),
        Arc::new(MoveTool::new(workspace_root)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ProcessManager;
    use sagent_domain::config::ExecConfig;

    #[tokio::test]
    async fn read_tool_reports_missing_file_as_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadTool::new(dir.path().to_path_buf());
        let outcome = tool
            .invoke(serde_json::json!({"path": "missing.txt"}))
            .await
            .unwrap();
        assert!(outcome.is_error);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let write = WriteTool::new(dir.path().to_path_buf());
        write
            .invoke(serde_json::json!({"path": "a.txt", "content": "hi"}))
            .await
            .unwrap();
        let read = ReadTool::new(dir.path().to_path_buf());
        let outcome = read.invoke(serde_json::json!({"path": "a.txt"})).await.unwrap();
        assert!(!outcome.is_error);
        assert!(outcome.content.contains("hi"));
    }

    #[test]
    fn standard_tools_includes_exec_and_file_ops() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(ProcessManager::new(ExecConfig::default()));
        let tools = standard_tools(dir.path().to_path_buf(), manager);
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert!(names.contains(&"Bash"));
        assert!(names.contains(&"Read"));
        assert!(names.contains(&"Write"));
    }
}
