use serde::{Deserialize, Serialize};

/// A directed handoff from one agent to another.
///
/// Edges are immutable once built. The handoff payload is carried through
/// unmodified; the graph never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    key: String,
    source_key: String,
    target_key: String,
    #[serde(default = "empty_handoff")]
    handoff: serde_json::Value,
}

fn empty_handoff() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl Edge {
    /// Create an edge carrying `handoff`. The edge key is `"{source}-{target}"`.
    pub fn new(
        source_key: impl Into<String>,
        target_key: impl Into<String>,
        handoff: serde_json::Value,
    ) -> Self {
        let source_key = source_key.into();
        let target_key = target_key.into();
        Self {
            key: edge_key(&source_key, &target_key),
            source_key,
            target_key,
            handoff,
        }
    }

    /// Create an edge with an empty handoff payload.
    pub fn plain(source_key: impl Into<String>, target_key: impl Into<String>) -> Self {
        Self::new(source_key, target_key, empty_handoff())
    }

    /// Unique key for the source/target pair.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn target_key(&self) -> &str {
        &self.target_key
    }

    /// The opaque handoff payload.
    pub fn handoff(&self) -> &serde_json::Value {
        &self.handoff
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_key == self.target_key
    }
}

/// Derive the key for an edge between two nodes.
pub fn edge_key(source_key: &str, target_key: &str) -> String {
    format!("{}-{}", source_key, target_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_builders() {
        let e = Edge::plain("triage", "billing");
        assert_eq!(e.key(), "triage-billing");
        assert_eq!(e.source_key(), "triage");
        assert_eq!(e.target_key(), "billing");
        assert_eq!(e.handoff(), &serde_json::json!({}));
        assert!(!e.is_self_loop());

        let e = Edge::new(
            "customer-support-agent",
            "personalized-agent",
            serde_json::json!({"state": "from-root-to-personalized"}),
        );
        assert_eq!(e.key(), "customer-support-agent-personalized-agent");
        assert_eq!(e.handoff()["state"], "from-root-to-personalized");
    }

    #[test]
    fn test_self_loop() {
        assert!(Edge::plain("retry", "retry").is_self_loop());
    }

    #[test]
    fn test_deserialize_missing_handoff() {
        let edge: Edge = serde_json::from_str(
            r#"{"key": "a-b", "source_key": "a", "target_key": "b"}"#,
        )
        .unwrap();
        assert_eq!(edge.handoff(), &serde_json::json!({}));
    }
}
