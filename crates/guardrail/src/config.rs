//! Guardrail rule sets: `{Allow, Deny, Deny.final, Override, AskUser,
//! Sandbox}` assembled via [`GuardrailBuilder`] and composed hierarchically
//! via [`merge`], mirroring `PermissionConfiguration::merged`
//! (`sagent-permissions::rules`) but scoped per step rather than per
//! session.

use sagent_permissions::{DefaultAction, PermissionConfiguration};
use sagent_sandbox::SandboxConfiguration;

/// A declarative per-step security policy. Every list holds permission
/// patterns in the `sagent-permissions::Pattern` grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardrailConfig {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    pub final_deny: Vec<String>,
    pub overrides: Vec<String>,
    /// Patterns that force an interactive prompt regardless of `allow`.
    pub ask: Vec<String>,
    /// Replaces the inherited sandbox wholesale when set.
    pub sandbox: Option<SandboxConfiguration>,
}

/// Small result builder for constructing a [`GuardrailConfig`] at the call
/// site of a `.guardrail { ... }` step modifier.
#[derive(Debug, Clone, Default)]
pub struct GuardrailBuilder {
    cfg: GuardrailConfig,
}

impl GuardrailBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.allow.push(pattern.into());
        self
    }

    pub fn deny(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.deny.push(pattern.into());
        self
    }

    /// A `finalDeny` rule: not suppressible by any child `override`.
    pub fn deny_final(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.final_deny.push(pattern.into());
        self
    }

    /// Suppresses a matching inherited `deny` (never a `finalDeny`).
    pub fn override_rule(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.overrides.push(pattern.into());
        self
    }

    pub fn ask_user(mut self, pattern: impl Into<String>) -> Self {
        self.cfg.ask.push(pattern.into());
        self
    }

    pub fn sandbox(mut self, sandbox: SandboxConfiguration) -> Self {
        self.cfg.sandbox = Some(sandbox);
        self
    }

    pub fn build(self) -> GuardrailConfig {
        self.cfg
    }
}

impl GuardrailConfig {
    /// Projects `allow`/`deny`/`finalDeny`/`overrides` onto a
    /// `PermissionConfiguration` so it can be folded into a session's base
    /// configuration via `PermissionConfiguration::merged`. `ask` patterns
    /// have no equivalent in that schema and are not carried across;
    /// callers that need pattern-scoped asking use `guardrail::evaluate`
    /// directly instead of the plain permission engine.
    pub fn as_permission_overlay(
        &self,
        default_action: DefaultAction,
        enable_session_memory: bool,
    ) -> PermissionConfiguration {
        PermissionConfiguration {
            allow: self.allow.clone(),
            deny: self.deny.clone(),
            final_deny: self.final_deny.clone(),
            overrides: self.overrides.clone(),
            default_action,
            enable_session_memory,
        }
    }
}

fn dedup_concat(a: &[String], b: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    for item in a.iter().chain(b.iter()) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Merges a child guardrail into its parent: `allow`/`deny`/`finalDeny`/`ask`
/// lists concatenate (deduplicated), `override` entries in the child are
/// carried through unchanged (they are resolved against `deny` at decision
/// time, never against `finalDeny`), and a child `Sandbox` replaces the
/// inherited one.
pub fn merge(parent: &GuardrailConfig, child: &GuardrailConfig) -> GuardrailConfig {
    GuardrailConfig {
        allow: dedup_concat(&parent.allow, &child.allow),
        deny: dedup_concat(&parent.deny, &child.deny),
        final_deny: dedup_concat(&parent.final_deny, &child.final_deny),
        overrides: dedup_concat(&parent.overrides, &child.overrides),
        ask: dedup_concat(&parent.ask, &child.ask),
        sandbox: child.sandbox.clone().or_else(|| parent.sandbox.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(allow: &[&str], deny: &[&str]) -> GuardrailConfig {
        GuardrailConfig {
            allow: allow.iter().map(|s| s.to_string()).collect(),
            deny: deny.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn merge_concatenates_and_dedups() {
        let parent = g(&["Read"], &["Bash(rm:*)"]);
        let child = g(&["Write"], &["Bash(rm:*)"]);
        let merged = merge(&parent, &child);
        assert_eq!(merged.allow, vec!["Read", "Write"]);
        assert_eq!(merged.deny, vec!["Bash(rm:*)"]);
    }

    #[test]
    fn child_sandbox_replaces_parent() {
        let parent = GuardrailConfig {
            sandbox: Some(SandboxConfiguration::standard()),
            ..Default::default()
        };
        let child = GuardrailConfig {
            sandbox: Some(SandboxConfiguration::restrictive()),
            ..Default::default()
        };
        let merged = merge(&parent, &child);
        assert_eq!(merged.sandbox, Some(SandboxConfiguration::restrictive()));
    }

    #[test]
    fn child_without_sandbox_inherits_parent() {
        let parent = GuardrailConfig {
            sandbox: Some(SandboxConfiguration::read_only()),
            ..Default::default()
        };
        let child = GuardrailConfig::default();
        let merged = merge(&parent, &child);
        assert_eq!(merged.sandbox, Some(SandboxConfiguration::read_only()));
    }

    #[test]
    fn merge_is_idempotent_for_the_same_child() {
        let parent = g(&["Read"], &["Bash(rm:*)"]);
        let child = g(&["Write"], &["Bash(sudo:*)"]);
        let once = merge(&parent, &child);
        let twice = merge(&once, &child);
        assert_eq!(once, twice);
    }
}
