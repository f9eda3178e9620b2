//! Tool Pipeline (D): `PermissionMiddleware -> SandboxMiddleware -> Tool`.
//!
//! Every tool invocation is wrapped in an ordered middleware chain before it
//! reaches the tool itself. The chain is built once per [`AgentSession`] (or
//! test) from a [`ToolCallContext`] and is reused across calls; each call
//! produces exactly one [`AuditRecord`], appended to a bounded, lock-guarded
//! trail, mirroring how `ProcessManager` keeps a bounded session map.
//!
//! [`AgentSession`]: ../../sagent_sessions/struct.AgentSession.html

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use sagent_domain::trace::TraceEvent;
use sagent_permissions::{
    PermissionConfiguration, PermissionHandler, SessionMemory,
};
use sagent_sandbox::SandboxConfiguration;
use sagent_skills::SkillPermissions;

use crate::error::{Error, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The output of a single tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A pending call into a named tool with JSON arguments.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// Tools are opaque to the core: each declares a name, a human description,
/// and a static JSON-Schema for its arguments.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    /// Extracts the single "primary argument" string the permission engine
    /// matches `argPart` patterns against (e.g. a shell command, a file
    /// path). Tools with no natural primary argument return `None`, which
    /// restricts matching patterns to tool-only rules (no `(...)` part).
    fn primary_arg(&self, arguments: &Value) -> Option<String> {
        for key in ["command", "path", "query"] {
            if let Some(s) = arguments.get(key).and_then(Value::as_str) {
                return Some(s.to_string());
            }
        }
        None
    }

    /// Whether this tool spawns OS subprocesses — gates on
    /// `SandboxConfiguration::allow_subprocesses`.
    fn spawns_subprocess(&self) -> bool {
        false
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolOutcome>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Audit trail
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub call_id: String,
    pub tool_name: String,
    pub allowed: bool,
    pub success: bool,
    pub duration_ms: u64,
    pub detail: Option<String>,
}

/// Bounded, lock-guarded audit trail — never silently drops a record.
pub struct AuditTrail {
    records: RwLock<Vec<AuditRecord>>,
    cap: usize,
}

impl AuditTrail {
    pub fn new(cap: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            cap,
        }
    }

    fn push(&self, record: AuditRecord) {
        let mut guard = self.records.write();
        guard.push(record);
        if guard.len() > self.cap {
            let overflow = guard.len() - self.cap;
            guard.drain(0..overflow);
        }
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(10_000)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-session state the middleware chain reads from and writes to.
pub struct ToolCallContext {
    pub permissions: PermissionConfiguration,
    pub session_memory: Option<SessionMemory>,
    pub handler: Arc<dyn PermissionHandler>,
    pub sandbox: SandboxConfiguration,
    pub audit: AuditTrail,
    pub session_id: String,
    /// Patterns granted by currently-active skills (Skills Facade, L),
    /// folded into `permissions` as additional allow-rules by
    /// [`PermissionMiddleware`]. Shared with whatever `ActivateSkillTool`
    /// the session's tool set carries, so activating a skill is visible to
    /// the very next tool call.
    pub skills: Arc<SkillPermissions>,
}

impl ToolCallContext {
    pub fn new(
        permissions: PermissionConfiguration,
        sandbox: SandboxConfiguration,
        handler: Arc<dyn PermissionHandler>,
        session_id: impl Into<String>,
    ) -> Self {
        Self::with_skills(
            permissions,
            sandbox,
            handler,
            session_id,
            Arc::new(SkillPermissions::new()),
        )
    }

    pub fn with_skills(
        permissions: PermissionConfiguration,
        sandbox: SandboxConfiguration,
        handler: Arc<dyn PermissionHandler>,
        session_id: impl Into<String>,
        skills: Arc<SkillPermissions>,
    ) -> Self {
        Self {
            permissions,
            session_memory: Some(SessionMemory::new()),
            handler,
            sandbox,
            audit: AuditTrail::default(),
            session_id: session_id.into(),
            skills,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Middleware chain
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn handle<'a>(
        &'a self,
        call: PendingCall,
        ctx: &'a ToolCallContext,
        next: Next<'a>,
    ) -> Result<ToolOutcome>;
}

pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    tool: &'a dyn Tool,
}

impl<'a> Next<'a> {
    pub fn run(self, call: PendingCall, ctx: &'a ToolCallContext) -> BoxFuture<'a, Result<ToolOutcome>> {
        Box::pin(async move {
            match self.middlewares.split_first() {
                Some((mw, rest)) => {
                    let next = Next {
                        middlewares: rest,
                        tool: self.tool,
                    };
                    mw.handle(call, ctx, next).await
                }
                None => self.tool.invoke(call.arguments).await,
            }
        })
    }
}

/// Checks the effective `PermissionConfiguration` through the six-phase
/// evaluator of `sagent-permissions` before letting the call proceed.
pub struct PermissionMiddleware;

#[async_trait::async_trait]
impl Middleware for PermissionMiddleware {
    async fn handle<'a>(
        &'a self,
        call: PendingCall,
        ctx: &'a ToolCallContext,
        next: Next<'a>,
    ) -> Result<ToolOutcome> {
        let arg = next.tool.primary_arg(&call.arguments);
        // Fold in whatever guardrail is ambient — a step wrapped with
        // `.guardrail { ... }` installs its merged configuration here for
        // the duration of its `run`.
        let mut permissions = sagent_guardrail::effective_permission_config(&ctx.permissions);
        permissions.allow.extend(ctx.skills.patterns());

        let decision = sagent_permissions::evaluate(
            &permissions,
            ctx.session_memory.as_ref(),
            &call.tool_name,
            arg.as_deref(),
        );

        TraceEvent::PermissionDecision {
            tool: call.tool_name.clone(),
            decision: format!("{decision:?}"),
            rule: match &decision {
                sagent_permissions::Decision::Deny { rule, .. } => rule.clone(),
                _ => None,
            },
            phase: "pipeline".to_string(),
        }
        .emit();

        sagent_permissions::resolve(
            &permissions,
            ctx.session_memory.as_ref(),
            &call.tool_name,
            arg.as_deref(),
            ctx.handler.as_ref(),
            "tool pipeline",
        )
        .await
        .map_err(Error::Permission)?;

        next.run(call, ctx).await
    }
}

/// Gates subprocess-spawning tools against the ambient `SandboxConfiguration`
/// before they reach the tool itself, and installs that configuration into
/// the ambient context (`sagent_state::with_context`) so the tool can read
/// it and apply it to *how* it runs, not just whether it runs at all.
pub struct SandboxMiddleware;

#[async_trait::async_trait]
impl Middleware for SandboxMiddleware {
    async fn handle<'a>(
        &'a self,
        call: PendingCall,
        ctx: &'a ToolCallContext,
        next: Next<'a>,
    ) -> Result<ToolOutcome> {
        let sandbox = sagent_guardrail::effective_sandbox_config(&ctx.sandbox);
        if !sandbox.disabled && next.tool.spawns_subprocess() && !sandbox.allow_subprocesses {
            return Err(Error::Sandbox(sagent_sandbox::Error::SandboxUnavailable(
                "subprocess execution is disabled by sandbox configuration".to_string(),
            )));
        }
        sagent_state::with_context(sandbox, move || async move { next.run(call, ctx).await }).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wraps a fixed set of tools with a standard
/// `PermissionMiddleware -> SandboxMiddleware -> Tool` chain.
pub struct ToolPipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolPipeline {
    /// The standard middleware order: permission checks, then the sandbox
    /// gate, then the tool itself.
    pub fn standard(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            middlewares: vec![Arc::new(PermissionMiddleware), Arc::new(SandboxMiddleware)],
            tools,
        }
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tools(&self, names: Option<&[String]>) -> Vec<&Arc<dyn Tool>> {
        match names {
            None => self.tools.iter().collect(),
            Some(names) => self
                .tools
                .iter()
                .filter(|t| names.iter().any(|n| n == t.name()))
                .collect(),
        }
    }

    /// Runs one tool call through the middleware chain, recording exactly
    /// one [`AuditRecord`] regardless of outcome.
    pub async fn call(&self, call: PendingCall, ctx: &ToolCallContext) -> Result<ToolOutcome> {
        let started = std::time::Instant::now();
        let tool = match self.tool(&call.tool_name) {
            Some(t) => t.clone(),
            None => {
                let err = Error::ToolNotFound(call.tool_name.clone());
                ctx.audit.push(AuditRecord {
                    call_id: call.call_id.clone(),
                    tool_name: call.tool_name.clone(),
                    allowed: false,
                    success: false,
                    duration_ms: started.elapsed().as_millis() as u64,
                    detail: Some(err.to_string()),
                });
                return Err(err);
            }
        };

        let next = Next {
            middlewares: &self.middlewares,
            tool: tool.as_ref(),
        };

        let result = next.run(call.clone(), ctx).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (allowed, success, detail) = match &result {
            Ok(outcome) => (true, !outcome.is_error, None),
            Err(Error::Permission(e)) => (false, false, Some(e.to_string())),
            Err(e) => (true, false, Some(e.to_string())),
        };

        ctx.audit.push(AuditRecord {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            allowed,
            success,
            duration_ms,
            detail,
        });

        TraceEvent::ToolInvoked {
            session_id: ctx.session_id.clone(),
            tool: call.tool_name.clone(),
            success,
            duration_ms,
        }
        .emit();

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagent_permissions::{DefaultAction, NoHandler};

    struct EchoTool;

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "Echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn invoke(&self, arguments: Value) -> Result<ToolOutcome> {
            Ok(ToolOutcome::ok(arguments.to_string()))
        }
    }

    struct ShellTool;

    #[async_trait::async_trait]
    impl Tool for ShellTool {
        fn name(&self) -> &str {
            "Bash"
        }
        fn description(&self) -> &str {
            "runs a shell command"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        fn spawns_subprocess(&self) -> bool {
            true
        }
        async fn invoke(&self, _arguments: Value) -> Result<ToolOutcome> {
            Ok(ToolOutcome::ok("ran"))
        }
    }

    fn allow_all_ctx() -> ToolCallContext {
        ToolCallContext::new(
            PermissionConfiguration {
                default_action: DefaultAction::Allow,
                ..Default::default()
            },
            SandboxConfiguration::standard(),
            Arc::new(NoHandler),
            "test-session",
        )
    }

    #[tokio::test]
    async fn allowed_call_runs_and_audits_once() {
        let pipeline = ToolPipeline::standard(vec![Arc::new(EchoTool)]);
        let ctx = allow_all_ctx();
        let call = PendingCall {
            call_id: "c1".into(),
            tool_name: "Echo".into(),
            arguments: serde_json::json!({"x": 1}),
        };
        let outcome = pipeline.call(call, &ctx).await.unwrap();
        assert!(!outcome.is_error);
        assert_eq!(ctx.audit.len(), 1);
    }

    #[tokio::test]
    async fn denied_call_short_circuits_and_audits() {
        let pipeline = ToolPipeline::standard(vec![Arc::new(EchoTool)]);
        let ctx = ToolCallContext::new(
            PermissionConfiguration {
                deny: vec!["Echo".into()],
                default_action: DefaultAction::Allow,
                ..Default::default()
            },
            SandboxConfiguration::standard(),
            Arc::new(NoHandler),
            "test-session",
        );
        let call = PendingCall {
            call_id: "c1".into(),
            tool_name: "Echo".into(),
            arguments: serde_json::json!({}),
        };
        let err = pipeline.call(call, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        assert_eq!(ctx.audit.len(), 1);
        assert!(!ctx.audit.records()[0].allowed);
    }

    #[tokio::test]
    async fn subprocess_tool_blocked_when_sandbox_disallows() {
        let pipeline = ToolPipeline::standard(vec![Arc::new(ShellTool)]);
        let ctx = ToolCallContext::new(
            PermissionConfiguration {
                default_action: DefaultAction::Allow,
                ..Default::default()
            },
            SandboxConfiguration::restrictive(),
            Arc::new(NoHandler),
            "test-session",
        );
        let call = PendingCall {
            call_id: "c1".into(),
            tool_name: "Bash".into(),
            arguments: serde_json::json!({}),
        };
        let err = pipeline.call(call, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Sandbox(_)));
    }

    #[tokio::test]
    async fn unknown_tool_is_audited_as_not_found() {
        let pipeline = ToolPipeline::standard(vec![Arc::new(EchoTool)]);
        let ctx = allow_all_ctx();
        let call = PendingCall {
            call_id: "c1".into(),
            tool_name: "Nope".into(),
            arguments: serde_json::json!({}),
        };
        let err = pipeline.call(call, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
        assert_eq!(ctx.audit.len(), 1);
    }
}
