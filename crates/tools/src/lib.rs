//! Built-in tools and the Tool Pipeline (D).
//!
//! Implements the exec/process tool pair:
//! - `exec`: run commands foreground or auto-background after yieldMs
//! - `process`: manage background sessions (list/poll/log/write/kill/clear/remove)
//!
//! `pipeline` wraps every tool call in the `PermissionMiddleware ->
//! SandboxMiddleware -> Tool` chain and records one audit entry per attempt;
//! `builtin` adapts `exec`/`process`/`file_ops` into `Tool` implementations.

pub mod builtin;
pub mod error;
pub mod exec;
pub mod file_ops;
pub mod manager;
pub mod pipeline;
pub mod process;

pub use builtin::{
    standard_tools, AppendTool, DeleteTool, ExecTool, ListTool, MoveTool, ProcessTool, ReadTool,
    WriteTool,
};
pub use error::{Error, Result};
pub use manager::ProcessManager;
pub use pipeline::{
    AuditRecord, AuditTrail, Middleware, Next, PendingCall, PermissionMiddleware,
    SandboxMiddleware, Tool, ToolCallContext, ToolOutcome, ToolPipeline,
};
