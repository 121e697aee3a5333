use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single traversal run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration attached to a graph node.
///
/// The graph engine only looks at `enabled`; `value` is carried through
/// untouched for visitors (model settings, instructions, and so on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Key of the agent this config belongs to.
    pub key: String,
    /// Whether the agent is turned on.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Everything else, opaque to the engine.
    #[serde(default)]
    pub value: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

impl AgentConfig {
    /// An enabled config carrying `value`.
    pub fn enabled(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            value,
        }
    }

    /// The canonical disabled default, used for missing and disabled keys.
    pub fn disabled(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: false,
            value: serde_json::Value::Null,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_disabled_default() {
        let config = AgentConfig::disabled("missing-agent");
        assert_eq!(config.key, "missing-agent");
        assert!(!config.is_enabled());
        assert!(config.value.is_null());
    }

    #[test]
    fn test_deserialize_defaults_to_enabled() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"key": "triage", "value": {"model": "gpt-4"}}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.value["model"], "gpt-4");
    }
}
