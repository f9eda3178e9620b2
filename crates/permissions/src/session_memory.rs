//! Per-session "always allow"/"always block" memory, keyed by `(tool, argKey)`.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::rules::AlwaysDecision;

#[derive(Debug, Default)]
pub struct SessionMemory {
    entries: RwLock<HashMap<(String, String), AlwaysDecision>>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tool: &str, arg_key: &str) -> Option<AlwaysDecision> {
        self.entries
            .read()
            .get(&(tool.to_string(), arg_key.to_string()))
            .copied()
    }

    pub fn remember(&self, tool: &str, arg_key: &str, decision: AlwaysDecision) {
        self.entries
            .write()
            .insert((tool.to_string(), arg_key.to_string()), decision);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
