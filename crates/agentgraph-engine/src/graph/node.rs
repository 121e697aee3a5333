use serde::Serialize;

use agentgraph_core::types::AgentConfig;

use super::edge::Edge;

/// A node in the agent graph.
///
/// Wraps the agent key, its resolved config, and the outgoing edges in
/// edge-list order. Nodes hold no parent links; parents are looked up
/// through the [`GraphIndex`](super::GraphIndex).
#[derive(Debug, Clone, Serialize)]
pub struct AgentGraphNode {
    key: String,
    config: AgentConfig,
    edges: Vec<Edge>,
}

impl AgentGraphNode {
    pub fn new(key: impl Into<String>, config: AgentConfig, edges: Vec<Edge>) -> Self {
        Self {
            key: key.into(),
            config,
            edges,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Outgoing edges, in the order they were declared.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// A node is terminal when it has no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        self.edges.is_empty()
    }

    /// The outgoing edge to `target_key`, if any.
    pub fn edge_to(&self, target_key: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.target_key() == target_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_accessors() {
        let config = AgentConfig::enabled("triage", serde_json::json!({"model": "gpt-4"}));
        let node = AgentGraphNode::new(
            "triage",
            config.clone(),
            vec![
                Edge::plain("triage", "billing"),
                Edge::new("triage", "tech", serde_json::json!({"topic": "outage"})),
            ],
        );

        assert_eq!(node.key(), "triage");
        assert_eq!(node.config(), &config);
        assert_eq!(node.edges().len(), 2);
        assert_eq!(node.edges()[0].target_key(), "billing");
        assert_eq!(node.edges()[1].target_key(), "tech");
        assert!(!node.is_terminal());
        assert_eq!(node.edge_to("tech").unwrap().handoff()["topic"], "outage");
        assert!(node.edge_to("nowhere").is_none());
    }

    #[test]
    fn test_terminal_node() {
        let node = AgentGraphNode::new("closeout", AgentConfig::disabled("closeout"), vec![]);
        assert!(node.is_terminal());
    }
}
