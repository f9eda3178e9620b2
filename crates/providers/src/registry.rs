//! Provider registry.
//!
//! Holds the named [`LlmProvider`] instances an agent session and its
//! sub-agents draw from, plus a role-to-provider mapping (`"planner"`,
//! `"executor"`, ...) so a `Delegate` step can hand a sub-agent a role
//! name instead of a concrete provider id.

use std::collections::HashMap;
use std::sync::Arc;

use sagent_domain::error::{Error, Result};

use crate::traits::LlmProvider;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    roles: HashMap<String, String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `id`, replacing any prior registration.
    pub fn register(&mut self, id: impl Into<String>, provider: Arc<dyn LlmProvider>) {
        let id = id.into();
        tracing::info!(provider_id = %id, "registered LLM provider");
        self.providers.insert(id, provider);
    }

    /// Assign a role name to a provider id already registered.
    pub fn assign_role(&mut self, role: impl Into<String>, provider_id: impl Into<String>) {
        self.roles.insert(role.into(), provider_id.into());
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Resolve a provider by role name (e.g. "planner").
    pub fn for_role(&self, role: &str) -> Result<Arc<dyn LlmProvider>> {
        let provider_id = self
            .roles
            .get(role)
            .ok_or_else(|| Error::Config(format!("no provider assigned to role '{role}'")))?;
        self.get(provider_id).ok_or_else(|| {
            Error::Config(format!(
                "role '{role}' points at unregistered provider '{provider_id}'"
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn LlmProvider>)> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn list_roles(&self) -> HashMap<String, String> {
        self.roles.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    #[test]
    fn register_and_resolve_by_role() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock-1", Arc::new(MockProvider::new("mock-1")));
        registry.assign_role("planner", "mock-1");

        assert_eq!(registry.len(), 1);
        assert!(registry.for_role("planner").is_ok());
        assert!(registry.for_role("executor").is_err());
    }

    #[test]
    fn unregistered_role_target_is_an_error() {
        let mut registry = ProviderRegistry::new();
        registry.assign_role("planner", "missing");
        assert!(registry.for_role("planner").is_err());
    }
}
