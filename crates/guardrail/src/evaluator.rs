//! Guardrail-level decision function: the same six phases as
//! `sagent_permissions::evaluate`, with one guardrail-specific phase
//! (`AskUser` patterns) inserted ahead of `allow` so an explicit "ask me
//! about this" rule is never silently satisfied by a broader `allow`.

use sagent_permissions::{DefaultAction, Decision, Pattern};

use crate::config::GuardrailConfig;

fn compile(patterns: &[String]) -> Vec<Pattern> {
    patterns.iter().map(|p| Pattern::parse(p)).collect()
}

fn find_match<'a>(patterns: &'a [Pattern], tool_name: &str, arg: Option<&str>) -> Option<&'a Pattern> {
    patterns.iter().find(|p| p.matches(tool_name, arg))
}

/// Evaluate a merged guardrail against a single `(tool, arg)` request.
/// `default_action` is the fallback used once no list matches, typically the
/// session's own `PermissionConfiguration::default_action`.
pub fn evaluate(
    guardrail: &GuardrailConfig,
    default_action: DefaultAction,
    tool_name: &str,
    arg: Option<&str>,
) -> Decision {
    let final_deny = compile(&guardrail.final_deny);
    if let Some(m) = find_match(&final_deny, tool_name, arg) {
        return Decision::Deny {
            reason: format!("guardrail finalDeny matched {}", m.as_str()),
            rule: Some(m.as_str().to_string()),
        };
    }

    let overrides = compile(&guardrail.overrides);
    let override_hit = find_match(&overrides, tool_name, arg);

    let deny = compile(&guardrail.deny);
    if override_hit.is_none() {
        if let Some(m) = find_match(&deny, tool_name, arg) {
            return Decision::Deny {
                reason: format!("guardrail deny matched {}", m.as_str()),
                rule: Some(m.as_str().to_string()),
            };
        }
    }

    let ask = compile(&guardrail.ask);
    if find_match(&ask, tool_name, arg).is_some() {
        return Decision::Ask;
    }

    let allow = compile(&guardrail.allow);
    if find_match(&allow, tool_name, arg).is_some() {
        return Decision::Allow;
    }

    match default_action {
        DefaultAction::Allow => Decision::Allow,
        DefaultAction::Deny => Decision::Deny {
            reason: "guardrail defaultAction=deny".to_string(),
            rule: None,
        },
        DefaultAction::Ask => Decision::Ask,
    }
}
