//! `AgentSession` (J): conversational turns, tool dispatch, forking,
//! persistence, and sub-agent delegation, built on top of this crate's
//! gateway-derived routing primitives (`store`, `transcript`) plus
//! `sagent-providers`' `LlmProvider` and `sagent-tools`' `ToolPipeline`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use sagent_domain::error::Error as DomainError;
use sagent_domain::stream::{BoxStream, StreamEvent};
use sagent_domain::tool::{Message, ToolCall, ToolDefinition};
use sagent_permissions::{PermissionConfiguration, PermissionHandler};
use sagent_providers::{ChatRequest, LlmProvider};
use sagent_sandbox::SandboxConfiguration;
use sagent_tools::{PendingCall, Tool, ToolCallContext, ToolPipeline};

use crate::error::{Error, Result};
use crate::store::SessionStore;
use crate::transcript::{TranscriptLine, TranscriptWriter};

/// Which of a `ToolPipeline`'s named tools a session may call.
#[derive(Debug, Clone)]
pub enum ToolFilter {
    All,
    Only(HashSet<String>),
    Except(HashSet<String>),
}

impl ToolFilter {
    pub fn allows(&self, tool_name: &str) -> bool {
        match self {
            ToolFilter::All => true,
            ToolFilter::Only(set) => set.contains(tool_name),
            ToolFilter::Except(set) => !set.contains(tool_name),
        }
    }

    /// Narrows `self` by `other`, the way a sub-agent's `toolFilter`
    /// narrows whatever tool set its delegating parent already had
    /// (`config.tools ∩ definition.toolFilter`).
    pub fn intersect(&self, other: &ToolFilter) -> ToolFilter {
        match (self, other) {
            (ToolFilter::All, other) => other.clone(),
            (this, ToolFilter::All) => this.clone(),
            (ToolFilter::Only(a), ToolFilter::Only(b)) => {
                ToolFilter::Only(a.intersection(b).cloned().collect())
            }
            (ToolFilter::Only(a), ToolFilter::Except(b)) => {
                ToolFilter::Only(a.difference(b).cloned().collect())
            }
            (ToolFilter::Except(a), ToolFilter::Only(b)) => {
                ToolFilter::Only(b.difference(a).cloned().collect())
            }
            (ToolFilter::Except(a), ToolFilter::Except(b)) => {
                ToolFilter::Except(a.union(b).cloned().collect())
            }
        }
    }

    /// Returns a filter with `names` additionally excluded, on top of
    /// whatever `self` already allows — used to drop delegation tools when
    /// the next hop would exceed `maxDepth`.
    pub fn without(&self, names: &HashSet<String>) -> ToolFilter {
        self.intersect(&ToolFilter::Except(names.clone()))
    }
}

/// One typed transcript entry. Serializable so `save`/`resume` round-trip a
/// session's full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entry {
    UserPrompt {
        text: String,
        timestamp: DateTime<Utc>,
    },
    ModelResponse {
        content: String,
        timestamp: DateTime<Utc>,
    },
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments: Value,
        result: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },
    SubagentInvocation {
        name: String,
        prompt: String,
        response: String,
        timestamp: DateTime<Utc>,
    },
}

/// The result of one conversational turn.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub transcript_entries: Vec<Entry>,
    pub duration: Duration,
}

/// One incremental snapshot of a streamed turn.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub content: String,
    pub is_complete: bool,
}

/// Injection point for sub-agent delegation (`AgentSession::invoke_subagent`).
/// `sagent-sessions` cannot depend on `sagent-delegate`
/// without a cycle (delegate needs to create fresh sessions), so the
/// registry/depth/cycle logic lives in `sagent-delegate` and is wired in
/// here through this trait object — the same injection pattern
/// `sagent-permissions`/`sagent-tools` use for `PermissionHandler`.
#[async_trait::async_trait]
pub trait SubagentInvoker: Send + Sync {
    async fn invoke(&self, parent: &AgentSession, name: &str, prompt: &str) -> Result<AgentResponse>;
}

/// Construction parameters for `AgentSession::create`/`resume`.
pub struct SessionConfig {
    pub provider: Arc<dyn LlmProvider>,
    pub tools: Arc<ToolPipeline>,
    pub tool_filter: ToolFilter,
    pub instructions: String,
    pub permissions: PermissionConfiguration,
    pub sandbox: SandboxConfiguration,
    pub handler: Arc<dyn PermissionHandler>,
    pub store: Option<Arc<SessionStore>>,
    pub transcript_writer: Option<Arc<TranscriptWriter>>,
    pub auto_save: bool,
    pub invoker: Option<Arc<dyn SubagentInvoker>>,
}

struct SessionInner {
    id: String,
    instructions: String,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolPipeline>,
    tool_filter: ToolFilter,
    transcript: RwLock<Vec<Entry>>,
    tool_ctx: ToolCallContext,
    fork_parent: Option<String>,
    store: Option<Arc<SessionStore>>,
    transcript_writer: Option<Arc<TranscriptWriter>>,
    auto_save: bool,
    subagent_roster: RwLock<Vec<String>>,
    cancel: CancellationToken,
    invoker: Option<Arc<dyn SubagentInvoker>>,
}

/// A conversational session: transcript, tool access, and an LLM provider,
/// reference-counted so `fork`/`invoke_subagent` can hand out cheap clones.
#[derive(Clone)]
pub struct AgentSession {
    inner: Arc<SessionInner>,
}

/// On-disk round-trip format for `save`/`resume`. Only the persisted
/// parts: `{id, transcript, subagent-roster}`. Handlers, middleware, and
/// the tool pipeline are rewired from the `SessionConfig` passed to
/// `resume`, never serialized.
#[derive(Debug, Serialize, Deserialize)]
struct SessionBlob {
    id: String,
    transcript: Vec<Entry>,
    subagent_roster: Vec<String>,
}

const MAX_TOOL_ROUNDS: usize = 8;

impl AgentSession {
    /// Builds a new session with a fresh id, empty transcript, and the tool
    /// set derived from `config.tool_filter`.
    pub fn create(config: SessionConfig) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), None, config)
    }

    fn with_id(id: String, fork_parent: Option<String>, config: SessionConfig) -> Self {
        let tool_ctx = ToolCallContext::new(
            config.permissions,
            config.sandbox,
            config.handler,
            id.clone(),
        );
        let inner = SessionInner {
            id,
            instructions: config.instructions,
            provider: config.provider,
            tools: config.tools,
            tool_filter: config.tool_filter,
            transcript: RwLock::new(Vec::new()),
            tool_ctx,
            fork_parent,
            store: config.store,
            transcript_writer: config.transcript_writer,
            auto_save: config.auto_save,
            subagent_roster: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
            invoker: config.invoker,
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn instructions(&self) -> &str {
        &self.inner.instructions
    }

    /// The model provider this session was created with — handed to a
    /// sub-session on delegation as the parent's model provider.
    pub fn provider(&self) -> Arc<dyn LlmProvider> {
        self.inner.provider.clone()
    }

    pub fn tool_pipeline(&self) -> Arc<ToolPipeline> {
        self.inner.tools.clone()
    }

    pub fn tool_filter(&self) -> ToolFilter {
        self.inner.tool_filter.clone()
    }

    pub fn permissions(&self) -> PermissionConfiguration {
        self.inner.tool_ctx.permissions.clone()
    }

    pub fn sandbox(&self) -> SandboxConfiguration {
        self.inner.tool_ctx.sandbox.clone()
    }

    pub fn handler(&self) -> Arc<dyn PermissionHandler> {
        self.inner.tool_ctx.handler.clone()
    }

    pub fn fork_parent(&self) -> Option<&str> {
        self.inner.fork_parent.as_deref()
    }

    pub fn transcript(&self) -> Vec<Entry> {
        self.inner.transcript.read().clone()
    }

    pub fn subagent_roster(&self) -> Vec<String> {
        self.inner.subagent_roster.read().clone()
    }

    /// Cancels the session's in-flight turn, if any.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn push_entry(&self, entry: Entry) {
        self.inner.transcript.write().push(entry);
    }

    fn allowed_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.inner
            .tools
            .tools(None)
            .into_iter()
            .filter(|t| self.inner.tool_filter.allows(t.name()))
            .cloned()
            .collect()
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.allowed_tools()
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    fn build_messages(&self) -> Vec<Message> {
        let mut messages = vec![Message::system(self.inner.instructions.clone())];
        for entry in self.inner.transcript.read().iter() {
            match entry {
                Entry::UserPrompt { text, .. } => messages.push(Message::user(text.clone())),
                Entry::ModelResponse { content, .. } => {
                    messages.push(Message::assistant(content.clone()))
                }
                Entry::ToolCall {
                    call_id, result, ..
                } => messages.push(Message::tool_result(call_id.clone(), result.clone())),
                Entry::SubagentInvocation { name, response, .. } => messages.push(
                    Message::assistant(format!("[delegated to {name}] {response}")),
                ),
            }
        }
        messages
    }

    fn cancelled_error() -> Error {
        Error::Domain(DomainError::Cancelled("turn aborted by cancellation".to_string()))
    }

    /// Performs one conversational turn: calls the provider, pipelines any
    /// tool calls it requests through the tool filter, and feeds results
    /// back until the model stops calling tools or `MAX_TOOL_ROUNDS` is hit.
    pub async fn prompt(&self, text: &str) -> Result<AgentResponse> {
        let started = std::time::Instant::now();
        if self.is_cancelled() {
            return Err(Self::cancelled_error());
        }

        let user_entry = Entry::UserPrompt {
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.push_entry(user_entry.clone());
        let mut turn_entries = vec![user_entry];
        let mut final_content = String::new();
        let mut all_tool_calls = Vec::new();

        for _ in 0..MAX_TOOL_ROUNDS {
            if self.is_cancelled() {
                return Err(Self::cancelled_error());
            }

            let request = ChatRequest {
                messages: self.build_messages(),
                tools: self.tool_definitions(),
                ..Default::default()
            };
            let response = self.inner.provider.chat(request).await.map_err(Error::Domain)?;

            if !response.content.is_empty() {
                let entry = Entry::ModelResponse {
                    content: response.content.clone(),
                    timestamp: Utc::now(),
                };
                self.push_entry(entry.clone());
                turn_entries.push(entry);
                final_content = response.content.clone();
            }

            if response.tool_calls.is_empty() {
                break;
            }

            for call in &response.tool_calls {
                let entry = self.dispatch_tool_call(call).await;
                self.push_entry(entry.clone());
                turn_entries.push(entry);
            }
            all_tool_calls.extend(response.tool_calls);
        }

        let duration = started.elapsed();
        self.persist_turn(&turn_entries)?;

        Ok(AgentResponse {
            content: final_content,
            tool_calls: all_tool_calls,
            transcript_entries: turn_entries,
            duration,
        })
    }

    async fn dispatch_tool_call(&self, call: &ToolCall) -> Entry {
        if !self.inner.tool_filter.allows(&call.tool_name) {
            return Entry::ToolCall {
                call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                arguments: call.arguments.clone(),
                result: format!("tool '{}' is not available in this session", call.tool_name),
                success: false,
                timestamp: Utc::now(),
            };
        }

        let pending = PendingCall {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            arguments: call.arguments.clone(),
        };
        let outcome = self.inner.tools.call(pending, &self.inner.tool_ctx).await;
        let (result, success) = match outcome {
            Ok(o) => (o.content, !o.is_error),
            Err(e) => (e.to_string(), false),
        };

        Entry::ToolCall {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            arguments: call.arguments.clone(),
            result,
            success,
            timestamp: Utc::now(),
        }
    }

    fn persist_turn(&self, entries: &[Entry]) -> Result<()> {
        if let Some(writer) = &self.inner.transcript_writer {
            let lines: Vec<TranscriptLine> = entries.iter().map(entry_to_line).collect();
            writer.append(&self.inner.id, &lines).map_err(Error::Domain)?;
        }
        if self.inner.auto_save {
            if let Some(store) = self.inner.store.clone() {
                self.save(&store)?;
            }
        }
        Ok(())
    }

    /// Yields partial content as it streams in; the final snapshot has
    /// `is_complete = true` and the accumulated content is appended to the
    /// transcript as a single `ModelResponse`.
    pub fn stream(&self, text: &str) -> BoxStream<'static, Result<Snapshot>> {
        let session = self.clone();
        let text = text.to_string();
        Box::pin(async_stream::stream! {
            if session.is_cancelled() {
                yield Err(AgentSession::cancelled_error());
                return;
            }

            session.push_entry(Entry::UserPrompt { text: text.clone(), timestamp: Utc::now() });

            let request = ChatRequest {
                messages: session.build_messages(),
                tools: session.tool_definitions(),
                ..Default::default()
            };

            let mut events = match session.inner.provider.chat_stream(request).await {
                Ok(events) => events,
                Err(e) => {
                    yield Err(Error::Domain(e));
                    return;
                }
            };

            let mut acc = String::new();
            while let Some(event) = events.next().await {
                if session.is_cancelled() {
                    yield Err(AgentSession::cancelled_error());
                    return;
                }
                match event {
                    Ok(StreamEvent::Token { text }) => {
                        acc.push_str(&text);
                        yield Ok(Snapshot { content: acc.clone(), is_complete: false });
                    }
                    Ok(StreamEvent::Done { .. }) => {
                        let entry = Entry::ModelResponse { content: acc.clone(), timestamp: Utc::now() };
                        session.push_entry(entry.clone());
                        let _ = session.persist_turn(std::slice::from_ref(&entry));
                        yield Ok(Snapshot { content: acc.clone(), is_complete: true });
                        return;
                    }
                    Ok(StreamEvent::Error { message }) => {
                        yield Err(Error::Domain(DomainError::Provider {
                            provider: session.inner.provider.provider_id().to_string(),
                            message,
                        }));
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(Error::Domain(e));
                        return;
                    }
                }
            }
        })
    }

    /// Snapshots the transcript and sub-agent roster into a new session
    /// with a fresh id. No parent state other than what's copied here is
    /// shared: a fresh `SessionMemory`/`AuditTrail` is started for the fork.
    pub fn fork(&self) -> Self {
        let new_id = uuid::Uuid::new_v4().to_string();
        let tool_ctx = ToolCallContext::new(
            self.inner.tool_ctx.permissions.clone(),
            self.inner.tool_ctx.sandbox.clone(),
            self.inner.tool_ctx.handler.clone(),
            new_id.clone(),
        );
        let inner = SessionInner {
            id: new_id.clone(),
            instructions: self.inner.instructions.clone(),
            provider: self.inner.provider.clone(),
            tools: self.inner.tools.clone(),
            tool_filter: self.inner.tool_filter.clone(),
            transcript: RwLock::new(self.inner.transcript.read().clone()),
            tool_ctx,
            fork_parent: Some(self.inner.id.clone()),
            store: self.inner.store.clone(),
            transcript_writer: self.inner.transcript_writer.clone(),
            auto_save: self.inner.auto_save,
            subagent_roster: RwLock::new(self.inner.subagent_roster.read().clone()),
            cancel: CancellationToken::new(),
            invoker: self.inner.invoker.clone(),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Persists `{id, transcript, subagent-roster}` under `store`'s
    /// transcript directory as `<id>.state.json`.
    pub fn save(&self, store: &SessionStore) -> Result<()> {
        let blob = SessionBlob {
            id: self.inner.id.clone(),
            transcript: self.transcript(),
            subagent_roster: self.subagent_roster(),
        };
        let path = store.transcript_dir().join(format!("{}.state.json", blob.id));
        let json = serde_json::to_string_pretty(&blob).map_err(DomainError::Json)?;
        std::fs::write(&path, json).map_err(DomainError::Io)?;
        Ok(())
    }

    /// Loads a previously-`save`d session, rewiring its handlers/middleware
    /// from `config` (`config.store` should point at the same store `id`
    /// was saved under).
    pub fn resume(id: &str, store: &SessionStore, config: SessionConfig) -> Result<Self> {
        let path = store.transcript_dir().join(format!("{id}.state.json"));
        let raw = std::fs::read_to_string(&path).map_err(DomainError::Io)?;
        let blob: SessionBlob = serde_json::from_str(&raw).map_err(DomainError::Json)?;

        let session = Self::with_id(blob.id, None, config);
        *session.inner.transcript.write() = blob.transcript;
        *session.inner.subagent_roster.write() = blob.subagent_roster;
        Ok(session)
    }

    /// Delegates to a named sub-agent via the injected `SubagentInvoker`,
    /// recording the exchange as a `SubagentInvocation` transcript entry
    /// and roster append.
    pub async fn invoke_subagent(&self, name: &str, prompt: &str) -> Result<AgentResponse> {
        let invoker = self
            .inner
            .invoker
            .clone()
            .ok_or(Error::NoSubagentInvoker)?;

        let response = invoker.invoke(self, name, prompt).await?;

        self.push_entry(Entry::SubagentInvocation {
            name: name.to_string(),
            prompt: prompt.to_string(),
            response: response.content.clone(),
            timestamp: Utc::now(),
        });
        self.inner.subagent_roster.write().push(name.to_string());

        Ok(response)
    }
}

fn entry_to_line(entry: &Entry) -> TranscriptLine {
    match entry {
        Entry::UserPrompt { text, .. } => TranscriptLine {
            timestamp: Utc::now().to_rfc3339(),
            role: "user".to_string(),
            content: text.clone(),
            metadata: None,
        },
        Entry::ModelResponse { content, .. } => TranscriptLine {
            timestamp: Utc::now().to_rfc3339(),
            role: "assistant".to_string(),
            content: content.clone(),
            metadata: None,
        },
        Entry::ToolCall {
            tool_name,
            result,
            success,
            ..
        } => TranscriptLine {
            timestamp: Utc::now().to_rfc3339(),
            role: "tool".to_string(),
            content: result.clone(),
            metadata: Some(serde_json::json!({"tool": tool_name, "success": success})),
        },
        Entry::SubagentInvocation { name, response, .. } => TranscriptLine {
            timestamp: Utc::now().to_rfc3339(),
            role: "subagent".to_string(),
            content: response.clone(),
            metadata: Some(serde_json::json!({"subagent": name})),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagent_permissions::{DefaultAction, NoHandler};
    use sagent_providers::MockProvider;
    use sagent_sandbox::SandboxConfiguration;
    use sagent_tools::ToolPipeline;

    fn allow_all_config(provider: Arc<dyn LlmProvider>) -> SessionConfig {
        SessionConfig {
            provider,
            tools: Arc::new(ToolPipeline::standard(vec![])),
            tool_filter: ToolFilter::All,
            instructions: "You are a test agent.".to_string(),
            permissions: PermissionConfiguration {
                default_action: DefaultAction::Allow,
                ..Default::default()
            },
            sandbox: SandboxConfiguration::standard(),
            handler: Arc::new(NoHandler),
            store: None,
            transcript_writer: None,
            auto_save: false,
            invoker: None,
        }
    }

    #[tokio::test]
    async fn prompt_appends_user_and_model_entries() {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("test-model"));
        let session = AgentSession::create(allow_all_config(provider));

        let response = session.prompt("hello").await.unwrap();
        assert!(response.content.contains("hello"));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn fork_copies_transcript_with_a_new_id() {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("test-model"));
        let session = AgentSession::create(allow_all_config(provider));
        session.prompt("hello").await.unwrap();

        let forked = session.fork();
        assert_ne!(forked.id(), session.id());
        assert_eq!(forked.fork_parent(), Some(session.id()));
        assert_eq!(forked.transcript().len(), session.transcript().len());
    }

    #[tokio::test]
    async fn save_and_resume_round_trips_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()).unwrap());
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("test-model"));

        let mut config = allow_all_config(provider.clone());
        config.store = Some(store.clone());
        let session = AgentSession::create(config);
        session.prompt("hello").await.unwrap();
        session.save(&store).unwrap();

        let resumed = AgentSession::resume(session.id(), &store, allow_all_config(provider)).unwrap();
        assert_eq!(resumed.transcript().len(), session.transcript().len());
    }

    #[tokio::test]
    async fn cancelled_session_rejects_new_prompts() {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("test-model"));
        let session = AgentSession::create(allow_all_config(provider));
        session.cancel();
        let err = session.prompt("hello").await.unwrap_err();
        assert!(matches!(err, Error::Domain(DomainError::Cancelled(_))));
    }

    #[tokio::test]
    async fn invoke_subagent_without_invoker_errors() {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("test-model"));
        let session = AgentSession::create(allow_all_config(provider));
        let err = session.invoke_subagent("helper", "do it").await.unwrap_err();
        assert!(matches!(err, Error::NoSubagentInvoker));
    }
}
