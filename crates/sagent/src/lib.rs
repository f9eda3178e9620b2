//! `sagent` — the facade crate for the declarative agent orchestration
//! core: a single dependency that re-exports the step algebra, ambient
//! state system, tool harness, and agent session/delegation subsystems
//! from their individual crates.
//!
//! Downstream code typically only needs [`prelude`]; the per-subsystem
//! modules below exist so the crate names stay stable even if the
//! workspace is later re-split.

/// Wire-agnostic shared types: errors, chat messages, tool shapes,
/// streaming events, capabilities, the notebook contract, trace events.
pub mod domain {
    pub use sagent_domain::*;
}

/// Ambient State System (E, F): `Memory`/`Relay` cells and task-local
/// context propagation.
pub mod state {
    pub use sagent_state::*;
}

/// Step Algebra & Composition Runtime (G): `Step`, primitives, combinators,
/// the `chain!` macro, and the `Agent` sugar trait.
pub mod step {
    pub use sagent_step::*;
}

/// Pattern Matcher (A) + Permission Engine (B).
pub mod permissions {
    pub use sagent_permissions::*;
}

/// Sandbox Executor (C): OS process sandboxing.
pub mod sandbox {
    pub use sagent_sandbox::*;
}

/// Guardrail Layer (H): per-step policy composition.
pub mod guardrail {
    pub use sagent_guardrail::*;
}

/// The `LlmProvider` trait, capability types, and provider registry
/// consumed by Generation Steps.
pub mod providers {
    pub use sagent_providers::*;
}

/// Generation Steps (I): `GenerateText`, `Generate`, prompts, structured
/// output schemas.
pub mod generation {
    pub use sagent_generation::*;
}

/// Agent Session (J): lifecycle, transcript, forking, persistence.
pub mod sessions {
    pub use sagent_sessions::*;
}

/// Tool Pipeline (D): middleware chain, built-in tools, audit trail.
pub mod tools {
    pub use sagent_tools::*;
}

/// Skills Facade (L): progressive-disclosure skill activation.
pub mod skills {
    pub use sagent_skills::*;
}

/// Sub-agent Registry & Delegate (K).
pub mod delegate {
    pub use sagent_delegate::*;
}

/// The commonly used subset of every subsystem, in one `use` statement.
pub mod prelude {
    pub use sagent_delegate::{Delegate, SubagentDefinition, SubagentRegistry, SubagentRegistryBuilder};
    pub use sagent_domain::error::{Error as DomainError, Result as DomainResult};
    pub use sagent_generation::{Generate, GenerateText, Prompt, Structured};
    pub use sagent_guardrail::{GuardrailBuilder, GuardrailConfig, GuardrailExt};
    pub use sagent_permissions::{
        DefaultAction, PermissionConfiguration, PermissionDocument, PermissionHandler,
    };
    pub use sagent_sandbox::SandboxConfiguration;
    pub use sagent_sessions::{AgentResponse, AgentSession, SessionConfig, ToolFilter};
    pub use sagent_skills::SkillsRegistry;
    pub use sagent_state::{with_context, Memory, Relay};
    pub use sagent_step::{chain, Agent, Empty, Loop, MapStep, Parallel, Race, ReduceStep, Step, StepExt, Transform};
    pub use sagent_tools::{Tool, ToolPipeline};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn prelude_wires_a_trivial_chain_end_to_end() {
        let step = Transform::new(|s: String| s.trim().to_string())
            .then(Transform::new(|s: String| format!("Result: {s}")));
        assert_eq!(step.run("  hi ".to_string()).await.unwrap(), "Result: hi");
    }

    #[tokio::test]
    async fn prelude_builds_a_memory_relay_pair() {
        let memory = Memory::new(0_i64);
        let relay: Relay<i64> = memory.relay();
        relay.set(5);
        assert_eq!(memory.get(), 5);
    }

    #[test]
    fn prelude_exposes_a_default_permission_configuration() {
        let config = PermissionConfiguration {
            default_action: DefaultAction::Deny,
            ..Default::default()
        };
        assert_eq!(config.default_action, DefaultAction::Deny);
    }

    #[test]
    fn prelude_builds_an_empty_subagent_registry() {
        let registry = SubagentRegistryBuilder::new().build().unwrap();
        assert!(registry.get("missing").is_none());
        let _: Arc<SubagentRegistry> = Arc::new(registry);
    }
}
