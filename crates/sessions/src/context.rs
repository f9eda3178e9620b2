//! Ambient session/agent context: the dedicated
//! `SessionContext`/`AgentContext` keys that make the current
//! `LanguageModelSession`/`AgentSession` visible to generation steps and
//! delegation without explicit threading, built on `sagent_state`'s
//! type-indexed task-local table.

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use sagent_domain::tool::{Message, ToolDefinition};
use sagent_providers::LlmProvider;
use sagent_state::{get_context, with_context};

use crate::agent_session::AgentSession;

/// Generation sampling/limits shared by text and structured generation.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub sampling: Option<Sampling>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    Greedy,
    TopP(f32),
}

/// Opaque handle to a stateful conversation with a model.
/// Carries model identity, instructions, tool set, generation options, and
/// a running transcript of plain chat messages. Owned directly by a caller
/// that wants to invoke `GenerateText`/`Generate` without the full
/// `AgentSession` turn/tool-dispatch machinery.
#[derive(Clone)]
pub struct LanguageModelSession {
    provider: Arc<dyn LlmProvider>,
    instructions: String,
    tools: Vec<ToolDefinition>,
    options: GenerationOptions,
    transcript: Arc<RwLock<Vec<Message>>>,
}

impl LanguageModelSession {
    pub fn new(provider: Arc<dyn LlmProvider>, instructions: impl Into<String>) -> Self {
        Self {
            provider,
            instructions: instructions.into(),
            tools: Vec::new(),
            options: GenerationOptions::default(),
            transcript: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.transcript.read().clone()
    }

    pub fn push_message(&self, message: Message) {
        self.transcript.write().push(message);
    }

    /// All messages a completion request should carry: the system
    /// instructions followed by the running transcript.
    pub fn request_messages(&self) -> Vec<Message> {
        let mut messages = vec![Message::system(self.instructions.clone())];
        messages.extend(self.transcript.read().iter().cloned());
        messages
    }
}

/// Scopes `value` as the ambient `LanguageModelSession` for the extent of
/// `body`.
pub async fn with_session<F, Fut, R>(value: LanguageModelSession, body: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = R>,
{
    with_context(value, body).await
}

/// Reads the nearest enclosing `with_session` value, if any.
pub fn current_session() -> Option<LanguageModelSession> {
    get_context::<LanguageModelSession>()
}

/// Scopes `value` as the ambient `AgentSession` for the extent of `body`.
pub async fn with_agent<F, Fut, R>(value: AgentSession, body: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = R>,
{
    with_context(value, body).await
}

/// Reads the nearest enclosing `with_agent` value, if any.
pub fn current_agent() -> Option<AgentSession> {
    get_context::<AgentSession>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagent_providers::MockProvider;

    #[tokio::test]
    async fn with_session_installs_and_restores() {
        let session = LanguageModelSession::new(
            Arc::new(MockProvider::new("test-model")) as Arc<dyn LlmProvider>,
            "be helpful",
        );
        assert!(current_session().is_none());
        with_session(session, || async {
            assert!(current_session().is_some());
        })
        .await;
        assert!(current_session().is_none());
    }

    #[tokio::test]
    async fn push_message_extends_request_messages() {
        let session = LanguageModelSession::new(
            Arc::new(MockProvider::new("test-model")) as Arc<dyn LlmProvider>,
            "be helpful",
        );
        session.push_message(Message::user("hi"));
        let messages = session.request_messages();
        assert_eq!(messages.len(), 2);
    }
}
