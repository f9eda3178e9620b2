//! Notebook storage — a key-value contract for scratch state shared across a
//! session's tool calls. The core only specifies the contract; any concrete
//! backend (file, REST, MCP) is out of scope and lives outside this crate.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Maximum size, in bytes, of a single stored value.
pub const MAX_VALUE_BYTES: usize = 1024 * 1024;

/// A mutex-guarded key-value contract. Keys are unique; each operation is
/// atomic with respect to other operations on the same storage.
pub trait NotebookStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Option<String>;
    fn keys(&self) -> Vec<String>;
}

/// Default in-process implementation backed by a single `Mutex<HashMap>`.
#[derive(Default)]
pub struct InMemoryNotebook {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryNotebook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotebookStorage for InMemoryNotebook {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        if value.len() > MAX_VALUE_BYTES {
            return Err(Error::Other(format!(
                "notebook value for '{key}' exceeds the {MAX_VALUE_BYTES}-byte cap"
            )));
        }
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().remove(key)
    }

    fn keys(&self) -> Vec<String> {
        let mut ks: Vec<String> = self.entries.lock().keys().cloned().collect();
        ks.sort();
        ks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let nb = InMemoryNotebook::new();
        nb.set("a", "1".into()).unwrap();
        assert_eq!(nb.get("a"), Some("1".into()));
    }

    #[test]
    fn oversized_value_rejected() {
        let nb = InMemoryNotebook::new();
        let big = "x".repeat(MAX_VALUE_BYTES + 1);
        assert!(nb.set("big", big).is_err());
    }

    #[test]
    fn remove_returns_previous_value() {
        let nb = InMemoryNotebook::new();
        nb.set("k", "v".into()).unwrap();
        assert_eq!(nb.remove("k"), Some("v".into()));
        assert_eq!(nb.get("k"), None);
    }

    #[test]
    fn keys_are_sorted() {
        let nb = InMemoryNotebook::new();
        nb.set("b", "1".into()).unwrap();
        nb.set("a", "1".into()).unwrap();
        assert_eq!(nb.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
