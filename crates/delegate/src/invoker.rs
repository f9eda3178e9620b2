//! `RegistryInvoker`: the `SubagentInvoker` that backs
//! `AgentSession::invoke_subagent` with cycle detection, depth limiting,
//! and fresh-sub-session construction drawing only the parent's model
//! provider and a narrowed tool set — no transcript or state cell is
//! inherited.

use std::sync::Arc;

use sagent_domain::trace::TraceEvent;
use sagent_sessions::{AgentResponse, AgentSession, SessionConfig, SubagentInvoker};

use crate::error::{Error, Result};
use crate::registry::SubagentRegistry;
use crate::stack::{current_stack, enter, DEFAULT_MAX_DEPTH};

pub struct RegistryInvoker {
    registry: Arc<SubagentRegistry>,
}

impl RegistryInvoker {
    pub fn new(registry: Arc<SubagentRegistry>) -> Self {
        Self { registry }
    }
}

/// The shared delegation mechanism, usable both by
/// `RegistryInvoker` (wired into `AgentSession::invoke_subagent`) and
/// directly by the `Delegate` step.
pub async fn invoke(
    parent: &AgentSession,
    registry: &Arc<SubagentRegistry>,
    name: &str,
    prompt: &str,
) -> Result<AgentResponse> {
    let definition = registry
        .get(name)
        .ok_or_else(|| Error::NotFound(name.to_string()))?;
    let max_depth = definition.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);

    let depth = current_stack().len() + 1;
    TraceEvent::DelegationStarted {
        subagent: name.to_string(),
        depth,
    }
    .emit();

    let parent = parent.clone();
    let registry = registry.clone();
    let prompt = prompt.to_string();
    let subagent_name = name.to_string();
    let outcome = enter(name, max_depth, move || async move {
        let narrowed = parent.tool_filter().intersect(&definition.tool_filter);
        let invoker: Arc<dyn SubagentInvoker> = Arc::new(RegistryInvoker::new(registry.clone()));
        let config = SessionConfig {
            provider: parent.provider(),
            tools: parent.tool_pipeline(),
            tool_filter: narrowed,
            instructions: definition.instructions.clone(),
            permissions: parent.permissions(),
            sandbox: parent.sandbox(),
            handler: parent.handler(),
            store: None,
            transcript_writer: None,
            auto_save: false,
            invoker: Some(invoker),
        };
        let sub = AgentSession::create(config);
        sub.prompt(&prompt).await.map_err(Error::Session)
    })
    .await?;

    TraceEvent::DelegationCompleted {
        subagent: subagent_name,
        depth,
        success: outcome.is_ok(),
    }
    .emit();

    outcome
}

#[async_trait::async_trait]
impl SubagentInvoker for RegistryInvoker {
    async fn invoke(
        &self,
        parent: &AgentSession,
        name: &str,
        prompt: &str,
    ) -> sagent_sessions::Result<AgentResponse> {
        invoke(parent, &self.registry, name, prompt)
            .await
            .map_err(|e| match e {
                Error::Session(inner) => inner,
                other => sagent_sessions::Error::SubagentFailed(name.to_string(), other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagent_permissions::{DefaultAction, NoHandler, PermissionConfiguration};
    use sagent_providers::{LlmProvider, MockProvider};
    use sagent_sandbox::SandboxConfiguration;
    use sagent_sessions::ToolFilter;
    use sagent_tools::ToolPipeline;
    use crate::registry::{SubagentDefinition, SubagentRegistryBuilder};

    fn root_session(invoker: Arc<dyn SubagentInvoker>) -> AgentSession {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("root-model"));
        AgentSession::create(SessionConfig {
            provider,
            tools: Arc::new(ToolPipeline::standard(vec![])),
            tool_filter: ToolFilter::All,
            instructions: "you are the root agent".to_string(),
            permissions: PermissionConfiguration {
                default_action: DefaultAction::Allow,
                ..Default::default()
            },
            sandbox: SandboxConfiguration::standard(),
            handler: Arc::new(NoHandler),
            store: None,
            transcript_writer: None,
            auto_save: false,
            invoker: Some(invoker),
        })
    }

    #[tokio::test]
    async fn delegation_runs_a_fresh_sub_session_and_returns_its_reply() {
        let mut builder = SubagentRegistryBuilder::new();
        builder = builder.add(SubagentDefinition::new("helper", "you help"));
        let registry = Arc::new(builder.build().unwrap());
        let invoker: Arc<dyn SubagentInvoker> = Arc::new(RegistryInvoker::new(registry));
        let root = root_session(invoker);

        let response = root.invoke_subagent("helper", "ping").await.unwrap();
        assert!(response.content.contains("ping"));
        assert_eq!(root.subagent_roster(), vec!["helper".to_string()]);
    }

    #[tokio::test]
    async fn missing_subagent_name_errors() {
        let registry = Arc::new(SubagentRegistryBuilder::new().build().unwrap());
        let invoker: Arc<dyn SubagentInvoker> = Arc::new(RegistryInvoker::new(registry));
        let root = root_session(invoker);

        let err = root.invoke_subagent("ghost", "ping").await.unwrap_err();
        assert!(matches!(err, sagent_sessions::Error::SubagentFailed(..)));
    }

    #[tokio::test]
    async fn a_cycle_between_two_subagents_is_rejected() {
        let mut builder = SubagentRegistryBuilder::new();
        builder = builder
            .add(SubagentDefinition::new("alpha", "delegate to beta"))
            .add(SubagentDefinition::new("beta", "delegate to alpha"));
        let registry = Arc::new(builder.build().unwrap());

        // Simulate alpha already being on the stack when beta tries to
        // delegate back into it.
        let result = enter("alpha", DEFAULT_MAX_DEPTH, || async {
            enter("beta", DEFAULT_MAX_DEPTH, || async {
                enter("alpha", DEFAULT_MAX_DEPTH, || async { () }).await
            })
            .await
        })
        .await;
        let result = result.unwrap().unwrap();
        assert!(matches!(result, Err(Error::CircularDelegation { stack }) if stack == vec!["alpha".to_string(), "beta".to_string(), "alpha".to_string()]));
        let _ = registry; // registry construction validated above; the cycle itself is stack-driven.
    }
}
