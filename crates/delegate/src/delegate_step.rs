//! `Delegate(subagent, prompt: I -> Prompt)`: a `Step<I, String>` that
//! hands work to a named sub-agent through the ambient `AgentSession`'s
//! `invoke_subagent`, so the same cycle-detection and depth-limiting in
//! `invoker::invoke` governs declarative step-graph delegation and direct
//! `AgentSession::invoke_subagent` calls alike.

use std::sync::Arc;

use sagent_generation::Prompt;
use sagent_sessions::context::current_agent;
use sagent_step::{leaf_err, Result, Step};

type PromptFn<I> = Arc<dyn Fn(&I) -> Prompt + Send + Sync>;

pub struct Delegate<I> {
    subagent: String,
    prompt_builder: PromptFn<I>,
}

impl<I> Delegate<I>
where
    I: Send + Sync + 'static,
{
    pub fn new(subagent: impl Into<String>, builder: impl Fn(&I) -> Prompt + Send + Sync + 'static) -> Self {
        Self {
            subagent: subagent.into(),
            prompt_builder: Arc::new(builder),
        }
    }
}

#[async_trait::async_trait]
impl<I> Step<I, String> for Delegate<I>
where
    I: Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<String> {
        let parent = current_agent().ok_or_else(|| {
            leaf_err("Delegate requires an ambient AgentSession (with_agent)")
        })?;
        let prompt = (self.prompt_builder)(&input);
        let response = parent
            .invoke_subagent(&self.subagent, &prompt.render())
            .await
            .map_err(leaf_err)?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::RegistryInvoker;
    use crate::registry::{SubagentDefinition, SubagentRegistryBuilder};
    use sagent_permissions::{DefaultAction, NoHandler, PermissionConfiguration};
    use sagent_providers::{LlmProvider, MockProvider};
    use sagent_sandbox::SandboxConfiguration;
    use sagent_sessions::context::with_agent;
    use sagent_sessions::{AgentSession, SessionConfig, SubagentInvoker, ToolFilter};
    use sagent_tools::ToolPipeline;

    #[tokio::test]
    async fn delegate_step_requires_ambient_agent() {
        let step = Delegate::<String>::new("helper", |s: &String| Prompt::from_text(s.clone()));
        let err = step.run("ping".to_string()).await.unwrap_err();
        assert!(matches!(err, sagent_step::Error::Other(_)));
    }

    #[tokio::test]
    async fn delegate_step_runs_the_named_subagent() {
        let registry = Arc::new(
            SubagentRegistryBuilder::new()
                .add(SubagentDefinition::new("helper", "you help"))
                .build()
                .unwrap(),
        );
        let invoker: Arc<dyn SubagentInvoker> = Arc::new(RegistryInvoker::new(registry));
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new("root-model"));
        let root = AgentSession::create(SessionConfig {
            provider,
            tools: Arc::new(ToolPipeline::standard(vec![])),
            tool_filter: ToolFilter::All,
            instructions: "root".to_string(),
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
        });

        let step = Delegate::<String>::new("helper", |s: &String| Prompt::from_text(s.clone()));
        let result = with_agent(root, || async { step.run("ping".to_string()).await })
            .await
            .unwrap();
        assert!(result.contains("ping"));
    }
}
