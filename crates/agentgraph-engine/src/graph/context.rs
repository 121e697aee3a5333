use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-traversal results, keyed by node key.
///
/// Each visited node's visitor output is stored under its key. Visitors can
/// read the entries of nodes visited before them: ancestors in a forward
/// traversal, descendants in a reverse one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext<V = serde_json::Value> {
    data: HashMap<String, V>,
}

impl<V> Default for ExecutionContext<V> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}

impl<V> ExecutionContext<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with initial entries.
    pub fn from_map(data: HashMap<String, V>) -> Self {
        Self { data }
    }

    /// Get the result stored for a node.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Store a node result, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.data.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Get the underlying data map.
    pub fn data(&self) -> &HashMap<String, V> {
        &self.data
    }

    pub fn into_inner(self) -> HashMap<String, V> {
        self.data
    }
}

impl ExecutionContext<serde_json::Value> {
    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}
