//! Sub-agent Registry: an in-memory `name -> SubagentDefinition` catalog.

use std::collections::HashMap;

use sagent_sessions::ToolFilter;

use crate::error::{Error, Result};

/// `{ name, instructions, toolFilter, maxDepth?, tags? }`.
/// Immutable once registered.
#[derive(Debug, Clone)]
pub struct SubagentDefinition {
    pub name: String,
    pub instructions: String,
    pub tool_filter: ToolFilter,
    /// Overrides `DEFAULT_MAX_DEPTH` for delegations into this sub-agent.
    pub max_depth: Option<usize>,
    pub tags: Vec<String>,
}

impl SubagentDefinition {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tool_filter: ToolFilter::All,
            max_depth: None,
            tags: Vec::new(),
        }
    }

    pub fn with_tool_filter(mut self, tool_filter: ToolFilter) -> Self {
        self.tool_filter = tool_filter;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

/// In-memory `name -> SubagentDefinition` catalog. Duplicate registrations
/// are rejected.
#[derive(Debug, Default)]
pub struct SubagentRegistry {
    definitions: HashMap<String, SubagentDefinition>,
}

impl SubagentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: SubagentDefinition) -> Result<()> {
        if self.definitions.contains_key(&definition.name) {
            return Err(Error::DuplicateName(definition.name));
        }
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SubagentDefinition> {
        self.definitions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Declarative construction: `SubagentRegistryBuilder::new().add(...).add(...).build()`.
#[derive(Debug, Default)]
pub struct SubagentRegistryBuilder {
    definitions: Vec<SubagentDefinition>,
}

impl SubagentRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, definition: SubagentDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(self) -> Result<SubagentRegistry> {
        let mut registry = SubagentRegistry::new();
        for definition in self.definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let result = SubagentRegistryBuilder::new()
            .add(SubagentDefinition::new("alpha", "do alpha things"))
            .add(SubagentDefinition::new("alpha", "different instructions"))
            .build();
        assert!(matches!(result, Err(Error::DuplicateName(name)) if name == "alpha"));
    }

    #[test]
    fn registered_definitions_are_retrievable_by_name() {
        let registry = SubagentRegistryBuilder::new()
            .add(SubagentDefinition::new("alpha", "do alpha things"))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("beta").is_none());
    }
}
