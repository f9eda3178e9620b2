//! Ambient guardrail context: entering a guarded step installs the merged
//! configuration for the lexical/async extent of its body, and the task-local
//! scope restores the parent's configuration on exit — no explicit
//! threading through call signatures.

use std::future::Future;

use sagent_permissions::PermissionConfiguration;
use sagent_sandbox::SandboxConfiguration;
use sagent_state::{get_context, with_context};

use crate::config::{merge, GuardrailConfig};

/// Wraps `body` so that `guardrail`, merged with whatever guardrail is
/// already ambient (if any), is the effective guardrail for its duration.
pub async fn with_guardrail<F, Fut, R>(guardrail: GuardrailConfig, body: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = R>,
{
    let effective = match current_guardrail() {
        Some(parent) => merge(&parent, &guardrail),
        None => guardrail,
    };
    with_context(effective, body).await
}

/// Reads the guardrail installed by the nearest enclosing `with_guardrail`,
/// already merged with all of its ancestors.
pub fn current_guardrail() -> Option<GuardrailConfig> {
    get_context::<GuardrailConfig>()
}

/// Folds the ambient guardrail's `allow`/`deny`/`finalDeny`/`overrides` into
/// `base`, for installation into a `ToolCallContext` (`sagent-tools::pipeline`)
/// immediately before a tool call. Returns `base` unchanged if no guardrail
/// is ambient.
pub fn effective_permission_config(base: &PermissionConfiguration) -> PermissionConfiguration {
    match current_guardrail() {
        None => base.clone(),
        Some(g) => {
            let overlay = g.as_permission_overlay(base.default_action, base.enable_session_memory);
            base.merged(&overlay)
        }
    }
}

/// The ambient guardrail's `Sandbox` override if one is installed, else
/// `base` unchanged.
pub fn effective_sandbox_config(base: &SandboxConfiguration) -> SandboxConfiguration {
    current_guardrail()
        .and_then(|g| g.sandbox)
        .unwrap_or_else(|| base.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardrailBuilder;

    #[tokio::test]
    async fn nested_guardrail_merges_with_parent() {
        let parent = GuardrailBuilder::new().allow("Read").build();
        let child = GuardrailBuilder::new().allow("Write").build();

        with_guardrail(parent, || async {
            assert!(current_guardrail().unwrap().allow == vec!["Read".to_string()]);
            with_guardrail(child, || async {
                let merged = current_guardrail().unwrap();
                assert_eq!(merged.allow, vec!["Read".to_string(), "Write".to_string()]);
            })
            .await;
            // parent scope restored after the nested guardrail exits.
            assert_eq!(current_guardrail().unwrap().allow, vec!["Read".to_string()]);
        })
        .await;

        assert!(current_guardrail().is_none());
    }

    #[tokio::test]
    async fn effective_permission_config_folds_in_ambient_guardrail() {
        let base = PermissionConfiguration {
            allow: vec!["Read".to_string()],
            ..Default::default()
        };
        let guardrail = GuardrailBuilder::new().deny("Bash(rm:*)").build();

        with_guardrail(guardrail, || async {
            let effective = effective_permission_config(&base);
            assert_eq!(effective.allow, vec!["Read".to_string()]);
            assert_eq!(effective.deny, vec!["Bash(rm:*)".to_string()]);
        })
        .await;

        // No ambient guardrail outside the scope: base passes through as-is.
        assert_eq!(effective_permission_config(&base).deny, Vec::<String>::new());
    }

    #[tokio::test]
    async fn effective_sandbox_config_uses_guardrail_override() {
        let base = SandboxConfiguration::standard();
        let guardrail = GuardrailBuilder::new()
            .sandbox(SandboxConfiguration::restrictive())
            .build();

        with_guardrail(guardrail, || async {
            assert_eq!(effective_sandbox_config(&base), SandboxConfiguration::restrictive());
        })
        .await;

        assert_eq!(effective_sandbox_config(&base), base);
    }
}
