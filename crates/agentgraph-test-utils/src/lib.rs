//! Shared fixtures for agentgraph tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use agentgraph_core::error::{GraphError, Result};
use agentgraph_core::resolver::StaticResolver;
use agentgraph_core::types::AgentConfig;
use agentgraph_engine::graph::{
    AgentGraph, AgentGraphNode, ExecutionContext, GraphDocument, NodeVisitor,
};

/// Support desk graph: root -> support -> {billing, escalation} -> closeout.
pub fn support_document() -> GraphDocument {
    GraphDocument::new("support-desk", "root")
        .with_edge("root", "support", serde_json::json!({"channel": "chat"}))
        .with_edge("support", "billing", serde_json::json!({"reason": "refund"}))
        .with_edge("support", "escalation", serde_json::json!({"reason": "outage"}))
        .with_edge("billing", "closeout", serde_json::json!({}))
        .with_edge("escalation", "closeout", serde_json::json!({}))
}

/// Diamond: r -> {a, b} -> c.
pub fn diamond_document() -> GraphDocument {
    GraphDocument::new("diamond", "r")
        .with_edge("r", "a", serde_json::json!({}))
        .with_edge("r", "b", serde_json::json!({}))
        .with_edge("a", "c", serde_json::json!({}))
        .with_edge("b", "c", serde_json::json!({}))
}

/// The depth-3 customer support graph, where minimal-agent is reachable both
/// straight from the root and through two intermediate agents.
pub const DEPTH_THREE_JSON: &str = r#"{
    "key": "test-agent-graph-depth-3",
    "root": "customer-support-agent",
    "edges": {
        "customer-support-agent": [
            {"key": "personalized-agent", "handoff": {"state": "from-root-to-personalized"}},
            {"key": "minimal-agent", "handoff": {"state": "from-root-to-minimal"}}
        ],
        "personalized-agent": [{"key": "multi-context-agent", "handoff": {}}],
        "multi-context-agent": [
            {"key": "minimal-agent", "handoff": {"state": "from-multi-context-to-minimal"}}
        ]
    }
}"#;

pub fn depth_three_document() -> GraphDocument {
    GraphDocument::from_json_str(DEPTH_THREE_JSON).expect("fixture parses")
}

/// Resolver with every key of `document` enabled.
pub fn resolver_for(document: &GraphDocument) -> StaticResolver {
    document
        .node_keys()
        .into_iter()
        .fold(StaticResolver::new(), |resolver, key| {
            let value = serde_json::json!({ "instructions": format!("You are {}.", key) });
            resolver.with(AgentConfig::enabled(key, value))
        })
}

/// Build `document` with every referenced agent enabled.
pub fn enabled_graph(document: &GraphDocument) -> AgentGraph {
    AgentGraph::build(document, &resolver_for(document))
}

/// Write `contents` to `name` inside a fresh temporary directory.
///
/// The directory is removed when the returned guard is dropped.
pub fn write_temp_file(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write temp file");
    (dir, path)
}

/// Async visitor that records visit order and checks that every earlier
/// result is already in the context.
///
/// Each node's result is `"{key}-test"`. Setting `fail_at` makes the visit of
/// that node return an error.
#[derive(Debug, Clone, Default)]
pub struct RecordingVisitor {
    order: Arc<Mutex<Vec<String>>>,
    fail_at: Option<String>,
}

impl RecordingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(key: impl Into<String>) -> Self {
        Self {
            fail_at: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().expect("order lock").clone()
    }
}

impl NodeVisitor<String> for RecordingVisitor {
    fn visit<'a>(
        &'a mut self,
        node: &'a AgentGraphNode,
        context: &'a ExecutionContext<String>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            if self.fail_at.as_deref() == Some(node.key()) {
                return Err(GraphError::visitor(node.key(), "injected failure"));
            }
            let mut order = self.order.lock().expect("order lock");
            for previous in order.iter() {
                let expected = format!("{}-test", previous);
                if context.get(previous) != Some(&expected) {
                    return Err(GraphError::visitor(
                        node.key(),
                        format!("result for {} missing from context", previous),
                    ));
                }
            }
            order.push(node.key().to_string());
            Ok(format!("{}-test", node.key()))
        })
    }
}
