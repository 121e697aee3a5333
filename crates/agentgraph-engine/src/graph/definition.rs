use std::collections::HashMap;

use tracing::{debug, warn};

use agentgraph_core::error::{GraphError, Result};
use agentgraph_core::traits::ConfigResolver;

use super::context::ExecutionContext;
use super::document::GraphDocument;
use super::index::GraphIndex;
use super::node::AgentGraphNode;
use super::traverse::TraversalResult;

/// An agent graph built from a document and a config resolver.
///
/// A graph is enabled only when the document is enabled, names a root, and
/// every agent it references resolves to an enabled config. A disabled
/// graph has no root and its traversals visit nothing.
#[derive(Debug, Clone)]
pub struct AgentGraph {
    key: String,
    enabled: bool,
    index: GraphIndex,
}

impl AgentGraph {
    /// Build the graph, reporting why it is unusable if it is.
    pub fn try_build(document: &GraphDocument, resolver: &dyn ConfigResolver) -> Result<Self> {
        let root_key = document.root.clone().ok_or(GraphError::RootMissing)?;
        if !document.enabled {
            return Err(GraphError::GraphDisabled(document.key.clone()));
        }

        let mut configs = HashMap::new();
        for key in document.node_keys() {
            let config = resolver.resolve(&key);
            if !config.enabled {
                if key == root_key {
                    return Err(GraphError::RootDisabled(key));
                }
                return Err(GraphError::AgentDisabled {
                    graph: document.key.clone(),
                    agent: key,
                });
            }
            configs.insert(key, config);
        }

        let index = GraphIndex::try_build(root_key, document.edge_list(), configs)?;
        debug!(graph = %document.key, nodes = index.len(), "Built agent graph");

        Ok(Self {
            key: document.key.clone(),
            enabled: true,
            index,
        })
    }

    /// Build the graph, falling back to a disabled graph when it is unusable.
    pub fn build(document: &GraphDocument, resolver: &dyn ConfigResolver) -> Self {
        match Self::try_build(document, resolver) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(graph = %document.key, error = %e, "Agent graph disabled");
                Self::disabled(&document.key, document.root.as_deref().unwrap_or_default())
            }
        }
    }

    /// A graph that is turned off.
    pub fn disabled(key: impl Into<String>, root_key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: false,
            index: GraphIndex::invalid(root_key),
        }
    }

    /// Override the depth safety bound used by forward traversal.
    pub fn with_max_depth_limit(mut self, limit: usize) -> Self {
        self.index = self.index.with_max_depth_limit(limit);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn index(&self) -> &GraphIndex {
        &self.index
    }

    pub fn root(&self) -> Option<&AgentGraphNode> {
        self.index.root()
    }

    pub fn get_node(&self, key: &str) -> Option<&AgentGraphNode> {
        self.index.get_node(key)
    }

    pub fn get_child_nodes(&self, key: &str) -> Vec<&AgentGraphNode> {
        self.index.get_child_nodes(key)
    }

    pub fn get_parent_nodes(&self, key: &str) -> Vec<&AgentGraphNode> {
        self.index.get_parent_nodes(key)
    }

    pub fn terminal_nodes(&self) -> Vec<&AgentGraphNode> {
        self.index.terminal_nodes()
    }

    /// See [`GraphIndex::traverse`].
    pub fn traverse<V, F>(&self, visitor: F, context: ExecutionContext<V>) -> TraversalResult<V>
    where
        F: FnMut(&AgentGraphNode, &ExecutionContext<V>) -> V,
    {
        self.index.traverse(visitor, context)
    }

    /// See [`GraphIndex::reverse_traverse`].
    pub fn reverse_traverse<V, F>(
        &self,
        visitor: F,
        context: ExecutionContext<V>,
    ) -> TraversalResult<V>
    where
        F: FnMut(&AgentGraphNode, &ExecutionContext<V>) -> V,
    {
        self.index.reverse_traverse(visitor, context)
    }
}
