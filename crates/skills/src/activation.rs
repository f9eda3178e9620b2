//! Skill activation — progressive disclosure plus a reference-counted
//! dynamic permission grant: activating a skill whose manifest names
//! `tools` installs those as allow-patterns in a session-scoped dynamic
//! rule list; the last activation of a given pattern to be deactivated
//! removes it. Counted per pattern, not per rule object, so two skills
//! granting the same pattern stay transitively correct.

use std::collections::HashMap;

use parking_lot::RwLock;

use sagent_domain::error::{Error, Result};
use sagent_domain::trace::TraceEvent;

use crate::registry::SkillsRegistry;

/// Session-scoped set of permission patterns granted by active skills.
/// `sagent-tools`' permission middleware reads a snapshot of this alongside
/// the static `PermissionConfiguration` when evaluating a tool call.
#[derive(Default)]
pub struct SkillPermissions {
    /// pattern -> number of active skills that granted it
    refcounts: RwLock<HashMap<String, usize>>,
}

impl SkillPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current patterns granted by at least one active skill.
    pub fn patterns(&self) -> Vec<String> {
        self.refcounts.read().keys().cloned().collect()
    }

    fn grant(&self, patterns: &[String]) {
        let mut map = self.refcounts.write();
        for p in patterns {
            *map.entry(p.clone()).or_insert(0) += 1;
        }
    }

    fn release(&self, patterns: &[String]) {
        let mut map = self.refcounts.write();
        for p in patterns {
            if let Some(count) = map.get_mut(p) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    map.remove(p);
                }
            }
        }
    }
}

/// An activated skill: full instructions plus the patterns it granted (so
/// deactivation can release exactly what activation granted).
pub struct ActivatedSkill {
    pub name: String,
    pub instructions: String,
    granted: Vec<String>,
}

/// Loads a skill's full instructions on demand and grants its declared tool
/// patterns into `permissions` for the duration of activation.
pub fn activate(
    registry: &SkillsRegistry,
    permissions: &SkillPermissions,
    skill_name: &str,
) -> Result<ActivatedSkill> {
    let instructions = registry.read_doc(skill_name)?;
    let entry = registry
        .list()
        .into_iter()
        .find(|e| e.name == skill_name)
        .ok_or_else(|| Error::SkillNotFound(skill_name.to_string()))?;

    let granted: Vec<String> = entry
        .manifest
        .as_ref()
        .map(|m| m.tools.clone())
        .unwrap_or_default();

    permissions.grant(&granted);
    TraceEvent::SkillActivated {
        skill_name: skill_name.to_string(),
        granted_patterns: granted.len(),
    }
    .emit();

    Ok(ActivatedSkill {
        name: skill_name.to_string(),
        instructions,
        granted,
    })
}

/// Deactivate a previously-activated skill, releasing its grants.
pub fn deactivate(permissions: &SkillPermissions, activated: &ActivatedSkill) {
    permissions.release(&activated.granted);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_release_is_refcounted() {
        let perms = SkillPermissions::new();
        perms.grant(&["Bash(git:*)".to_string()]);
        perms.grant(&["Bash(git:*)".to_string()]);
        assert_eq!(perms.patterns(), vec!["Bash(git:*)".to_string()]);

        perms.release(&["Bash(git:*)".to_string()]);
        assert_eq!(perms.patterns(), vec!["Bash(git:*)".to_string()]);

        perms.release(&["Bash(git:*)".to_string()]);
        assert!(perms.patterns().is_empty());
    }

    #[test]
    fn distinct_patterns_are_independent() {
        let perms = SkillPermissions::new();
        perms.grant(&["Read".to_string(), "Write(/tmp/*)".to_string()]);
        perms.release(&["Read".to_string()]);
        assert_eq!(perms.patterns(), vec!["Write(/tmp/*)".to_string()]);
    }
}
