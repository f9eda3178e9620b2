//! Rule sets and the JSON-serializable permission configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultAction {
    Allow,
    Deny,
    Ask,
}

impl Default for DefaultAction {
    fn default() -> Self {
        DefaultAction::Ask
    }
}

fn default_true() -> bool {
    true
}

/// The static, serializable half of a permission configuration. Handlers are
/// attached separately and are never serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionConfiguration {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default, rename = "finalDeny")]
    pub final_deny: Vec<String>,
    #[serde(default)]
    pub overrides: Vec<String>,
    #[serde(default, rename = "defaultAction")]
    pub default_action: DefaultAction,
    #[serde(default = "default_true", rename = "enableSessionMemory")]
    pub enable_session_memory: bool,
}

/// Wrapper matching the top-level `{ "version": 1, "permissions": {...} }`
/// envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDocument {
    pub version: u32,
    pub permissions: PermissionConfiguration,
}

impl PermissionConfiguration {
    /// Concatenates `self`'s lists with `other`'s, deduplicating while
    /// preserving first occurrence; `other`'s `default_action` wins.
    pub fn merged(&self, other: &PermissionConfiguration) -> PermissionConfiguration {
        PermissionConfiguration {
            allow: dedup_concat(&self.allow, &other.allow),
            deny: dedup_concat(&self.deny, &other.deny),
            final_deny: dedup_concat(&self.final_deny, &other.final_deny),
            overrides: dedup_concat(&self.overrides, &other.overrides),
            default_action: other.default_action,
            enable_session_memory: other.enable_session_memory,
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

/// The resolved outcome of evaluating a single `(tool, arg)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String, rule: Option<String> },
    Ask,
}

/// An interactive resolution to an `Ask` decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveDecision {
    AllowOnce,
    AllowAlways,
    DenyOnce,
    DenyAlways,
    Cancel,
}

/// The session-memory verdict persisted by `Always*` interactive decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlwaysDecision {
    Allow,
    Deny,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_dedups_preserving_first_occurrence() {
        let a = PermissionConfiguration {
            allow: vec!["Read".into(), "Write".into()],
            ..Default::default()
        };
        let b = PermissionConfiguration {
            allow: vec!["Write".into(), "Bash".into()],
            default_action: DefaultAction::Allow,
            ..Default::default()
        };
        let merged = a.merged(&b);
        assert_eq!(merged.allow, vec!["Read", "Write", "Bash"]);
        assert_eq!(merged.default_action, DefaultAction::Allow);
    }

    #[test]
    fn missing_fields_use_documented_defaults() {
        let json = r#"{"allow":["Read"]}"#;
        let cfg: PermissionConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.deny, Vec::<String>::new());
        assert_eq!(cfg.default_action, DefaultAction::Ask);
        assert!(cfg.enable_session_memory);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = PermissionConfiguration {
            allow: vec!["Read".into()],
            deny: vec!["Bash(rm:*)".into()],
            final_deny: vec![],
            overrides: vec![],
            default_action: DefaultAction::Ask,
            enable_session_memory: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PermissionConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(back.allow, cfg.allow);
        assert_eq!(back.deny, cfg.deny);
        assert_eq!(back.default_action, cfg.default_action);
    }
}
