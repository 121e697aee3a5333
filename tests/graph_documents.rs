use agentgraph_core::error::GraphError;
use agentgraph_engine::graph::{AgentGraph, GraphDocument};
use agentgraph_test_utils::{write_temp_file, DEPTH_THREE_JSON};

#[test]
fn test_load_json_document_and_build() {
    let (_dir, path) = write_temp_file("depth3.json", DEPTH_THREE_JSON);
    let doc = GraphDocument::load(&path).expect("load document");

    let resolver = |key: &str| {
        agentgraph_core::types::AgentConfig::enabled(key, serde_json::json!({}))
    };
    let graph = AgentGraph::try_build(&doc, &resolver).expect("build graph");
    assert_eq!(graph.key(), "test-agent-graph-depth-3");
    assert_eq!(graph.index().len(), 4);
    assert_eq!(graph.terminal_nodes().len(), 1);
}

#[test]
fn test_toml_document_with_inline_agents() {
    let (_dir, path) = write_temp_file(
        "support.toml",
        r#"
key = "support-desk"
root = "triage"

[[edges.triage]]
key = "billing"
handoff = { reason = "refund" }

[[edges.triage]]
key = "tech"

[agents.triage]
instructions = "Route the ticket."

[agents.billing]
instructions = "Handle refunds."

[agents.tech]
instructions = "Debug the issue."
"#,
    );
    let doc = GraphDocument::load(&path).expect("load document");
    let graph = AgentGraph::try_build(&doc, &doc.inline_resolver()).expect("build graph");

    let children: Vec<&str> = graph
        .get_child_nodes("triage")
        .iter()
        .map(|n| n.key())
        .collect();
    assert_eq!(children, vec!["billing", "tech"]);
    assert_eq!(
        graph.get_node("billing").unwrap().config().value["instructions"],
        "Handle refunds."
    );
}

#[test]
fn test_inline_disabled_agent_disables_graph() {
    let (_dir, path) = write_temp_file(
        "disabled.toml",
        r#"
root = "triage"

[[edges.triage]]
key = "billing"

[agents.triage]

[agents.billing]
enabled = false
"#,
    );
    let doc = GraphDocument::load(&path).expect("load document");
    let err = AgentGraph::try_build(&doc, &doc.inline_resolver()).unwrap_err();
    assert!(matches!(err, GraphError::AgentDisabled { ref agent, .. } if agent == "billing"));
}

#[test]
fn test_malformed_document() {
    let (_dir, path) = write_temp_file("broken.json", r#"{"root": "r", "edges": "#);
    let err = GraphDocument::load(&path).unwrap_err();
    assert!(matches!(err, GraphError::Json(_)));
}
