//! Six-phase evaluator: `finalDeny -> session memory -> overrides -> deny ->
//! allow -> defaultAction`.

use crate::error::{Error, Result};
use crate::handler::PermissionHandler;
use crate::pattern::Pattern;
use crate::rules::{AlwaysDecision, Decision, DefaultAction, InteractiveDecision, PermissionConfiguration};
use crate::session_memory::SessionMemory;

fn compile(patterns: &[String]) -> Vec<Pattern> {
    patterns.iter().map(|p| Pattern::parse(p)).collect()
}

fn find_match<'a>(patterns: &'a [Pattern], tool_name: &str, arg: Option<&str>) -> Option<&'a Pattern> {
    patterns.iter().find(|p| p.matches(tool_name, arg))
}

/// Pure decision function, phases 1-6. Phase 2 (session memory) is skipped
/// when `memory` is `None` or disabled by config.
pub fn evaluate(
    config: &PermissionConfiguration,
    memory: Option<&SessionMemory>,
    tool_name: &str,
    arg: Option<&str>,
) -> Decision {
    let final_deny = compile(&config.final_deny);
    if let Some(m) = find_match(&final_deny, tool_name, arg) {
        return Decision::Deny {
            reason: format!("finalDeny matched {}", m.as_str()),
            rule: Some(m.as_str().to_string()),
        };
    }

    if config.enable_session_memory {
        if let Some(mem) = memory {
            let arg_key = arg.unwrap_or("");
            match mem.get(tool_name, arg_key) {
                Some(AlwaysDecision::Allow) => return Decision::Allow,
                Some(AlwaysDecision::Deny) => {
                    return Decision::Deny {
                        reason: "session memory: always block".to_string(),
                        rule: None,
                    }
                }
                None => {}
            }
        }
    }

    let overrides = compile(&config.overrides);
    let override_hit = find_match(&overrides, tool_name, arg);

    let deny = compile(&config.deny);
    if override_hit.is_none() {
        if let Some(m) = find_match(&deny, tool_name, arg) {
            return Decision::Deny {
                reason: format!("deny matched {}", m.as_str()),
                rule: Some(m.as_str().to_string()),
            };
        }
    }

    let allow = compile(&config.allow);
    if find_match(&allow, tool_name, arg).is_some() {
        return Decision::Allow;
    }

    match config.default_action {
        DefaultAction::Allow => Decision::Allow,
        DefaultAction::Deny => Decision::Deny {
            reason: "defaultAction=deny".to_string(),
            rule: None,
        },
        DefaultAction::Ask => Decision::Ask,
    }
}

/// Full resolution including the interactive handler and session-memory
/// updates on `Always*` decisions.
pub async fn resolve(
    config: &PermissionConfiguration,
    memory: Option<&SessionMemory>,
    tool_name: &str,
    arg: Option<&str>,
    handler: &dyn PermissionHandler,
    context: &str,
) -> Result<()> {
    match evaluate(config, memory, tool_name, arg) {
        Decision::Allow => Ok(()),
        Decision::Deny { reason, rule } => Err(Error::PermissionDenied {
            tool: tool_name.to_string(),
            reason,
            rule,
        }),
        Decision::Ask => {
            let decision = handler.request_decision(tool_name, arg, context).await;
            if config.enable_session_memory {
                if let Some(mem) = memory {
                    let arg_key = arg.unwrap_or("");
                    match decision {
                        InteractiveDecision::AllowAlways => {
                            mem.remember(tool_name, arg_key, AlwaysDecision::Allow)
                        }
                        InteractiveDecision::DenyAlways => {
                            mem.remember(tool_name, arg_key, AlwaysDecision::Deny)
                        }
                        _ => {}
                    }
                }
            }
            match decision {
                InteractiveDecision::AllowOnce | InteractiveDecision::AllowAlways => Ok(()),
                InteractiveDecision::DenyOnce | InteractiveDecision::DenyAlways => {
                    Err(Error::PermissionDenied {
                        tool: tool_name.to_string(),
                        reason: "user denied".to_string(),
                        rule: None,
                    })
                }
                InteractiveDecision::Cancel => Err(Error::PermissionDenied {
                    tool: tool_name.to_string(),
                    reason: "user cancelled".to_string(),
                    rule: None,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(
        allow: &[&str],
        deny: &[&str],
        final_deny: &[&str],
        overrides: &[&str],
        default_action: DefaultAction,
    ) -> PermissionConfiguration {
        PermissionConfiguration {
            allow: allow.iter().map(|s| s.to_string()).collect(),
            deny: deny.iter().map(|s| s.to_string()).collect(),
            final_deny: final_deny.iter().map(|s| s.to_string()).collect(),
            overrides: overrides.iter().map(|s| s.to_string()).collect(),
            default_action,
            enable_session_memory: true,
        }
    }

    #[test]
    fn deny_beats_allow_when_no_override() {
        let c = cfg(&["Read"], &["Bash(rm:*)"], &[], &[], DefaultAction::Ask);
        let decision = evaluate(&c, None, "Bash", Some("rm -rf /"));
        match decision {
            Decision::Deny { rule, .. } => assert_eq!(rule.as_deref(), Some("Bash(rm:*)")),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn override_suppresses_deny_but_not_final_deny() {
        let c = cfg(&[], &["Bash(sudo:*)"], &["Bash(sudo:*)"], &["Bash(sudo:*)"], DefaultAction::Ask);
        assert!(matches!(
            evaluate(&c, None, "Bash", Some("sudo ls")),
            Decision::Deny { .. }
        ));
    }

    #[test]
    fn override_without_final_deny_allows_through() {
        let c = cfg(&[], &["Bash(sudo:*)"], &[], &["Bash(sudo:*)"], DefaultAction::Deny);
        assert_eq!(evaluate(&c, None, "Bash", Some("sudo ls")), Decision::Allow);
    }

    #[test]
    fn final_deny_beats_session_memory() {
        let memory = SessionMemory::new();
        memory.remember("Bash", "sudo ls", AlwaysDecision::Allow);
        let c = cfg(&[], &[], &["Bash(sudo:*)"], &[], DefaultAction::Ask);
        let decision = evaluate(&c, Some(&memory), "Bash", Some("sudo ls"));
        assert!(matches!(decision, Decision::Deny { .. }));
        assert_eq!(memory.get("Bash", "sudo ls"), Some(AlwaysDecision::Allow));
    }

    #[test]
    fn empty_lists_with_default_deny_reject_all() {
        let c = cfg(&[], &[], &[], &[], DefaultAction::Deny);
        assert!(matches!(
            evaluate(&c, None, "AnyTool", None),
            Decision::Deny { .. }
        ));
    }

    #[test]
    fn final_deny_star_rejects_every_tool() {
        let c = cfg(&["*"], &[], &["*"], &[], DefaultAction::Allow);
        assert!(matches!(
            evaluate(&c, None, "Write", Some("/tmp/x")),
            Decision::Deny { .. }
        ));
    }

    #[test]
    fn canonicalized_write_path_denied_by_final_deny() {
        let c = cfg(&[], &[], &["Write(/etc/*)"], &[], DefaultAction::Allow);
        assert!(matches!(
            evaluate(&c, None, "Write", Some("/tmp/../etc/x")),
            Decision::Deny { .. }
        ));
    }

    #[test]
    fn default_ask_when_nothing_matches() {
        let c = cfg(&["Read"], &[], &[], &[], DefaultAction::Ask);
        assert_eq!(evaluate(&c, None, "Write", Some("/tmp/x")), Decision::Ask);
    }
}
