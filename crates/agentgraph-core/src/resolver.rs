use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::traits::ConfigResolver;
use crate::types::AgentConfig;

/// One agent entry in a static config table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEntry {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Remaining fields are kept as-is.
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

/// Resolver backed by an in-memory table of agent configs.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    configs: HashMap<String, AgentConfig>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a table of agent entries keyed by agent key.
    pub fn from_entries(entries: HashMap<String, AgentEntry>) -> Self {
        let configs = entries
            .into_iter()
            .map(|(key, entry)| {
                let config = AgentConfig {
                    key: key.clone(),
                    enabled: entry.enabled,
                    value: serde_json::Value::Object(entry.settings),
                };
                (key, config)
            })
            .collect();
        Self { configs }
    }

    /// Add or replace a config.
    pub fn insert(&mut self, config: AgentConfig) {
        self.configs.insert(config.key.clone(), config);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, config: AgentConfig) -> Self {
        self.insert(config);
        self
    }

    /// Add an enabled agent with an empty config.
    pub fn with_agent(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.with(AgentConfig::enabled(key, serde_json::json!({})))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl ConfigResolver for StaticResolver {
    fn resolve(&self, key: &str) -> AgentConfig {
        self.configs
            .get(key)
            .cloned()
            .unwrap_or_else(|| AgentConfig::disabled(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_resolves_disabled() {
        let resolver = StaticResolver::new().with_agent("triage");
        assert!(resolver.resolve("triage").enabled);

        let missing = resolver.resolve("ghost");
        assert_eq!(missing, AgentConfig::disabled("ghost"));
    }

    #[test]
    fn test_from_entries_keeps_settings() {
        let entries: HashMap<String, AgentEntry> = serde_json::from_str(
            r#"{
                "triage": {"instructions": "Route the ticket.", "model": {"name": "gpt-4"}},
                "legacy": {"enabled": false}
            }"#,
        )
        .unwrap();
        let resolver = StaticResolver::from_entries(entries);
        assert_eq!(resolver.len(), 2);

        let triage = resolver.resolve("triage");
        assert!(triage.enabled);
        assert_eq!(triage.value["instructions"], "Route the ticket.");
        assert_eq!(triage.value["model"]["name"], "gpt-4");

        assert!(!resolver.resolve("legacy").enabled);
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |key: &str| AgentConfig::enabled(key, serde_json::json!({"echo": key}));
        let config = resolver.resolve("writer");
        assert_eq!(config.value["echo"], "writer");
    }
}
