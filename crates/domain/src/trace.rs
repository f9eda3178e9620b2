use serde::Serialize;

/// Structured trace events emitted across all crates in the workspace.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SkillDocLoaded {
        skill_name: String,
        doc_chars: usize,
    },
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    SessionResolved {
        session_key: String,
        session_id: String,
        is_new: bool,
    },
    SessionReset {
        session_key: String,
        old_session_id: String,
        new_session_id: String,
        reason: String,
    },
    TranscriptAppend {
        session_id: String,
        lines: usize,
    },
    IdentityResolved {
        raw_peer_id: String,
        canonical: String,
    },
    PermissionDecision {
        tool: String,
        decision: String,
        rule: Option<String>,
        phase: String,
    },
    SandboxExecuted {
        exe: String,
        exit_code: Option<i32>,
        duration_ms: u64,
        truncated: bool,
    },
    ToolInvoked {
        session_id: String,
        tool: String,
        success: bool,
        duration_ms: u64,
    },
    DelegationStarted {
        subagent: String,
        depth: usize,
    },
    DelegationCompleted {
        subagent: String,
        depth: usize,
        success: bool,
    },
    SkillActivated {
        skill_name: String,
        granted_patterns: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sa_event");
    }
}
