use std::collections::HashMap;

use tracing::{debug, warn};

use agentgraph_core::error::{GraphError, Result};
use agentgraph_core::types::AgentConfig;

use super::edge::Edge;
use super::node::AgentGraphNode;

/// Default safety bound on recorded path length during depth computation.
pub const DEFAULT_MAX_DEPTH_LIMIT: usize = 10;

/// Navigable node/edge structure built once from a root key and an edge list.
///
/// Nodes live in an arena in insertion order (root first, then each edge's
/// source and target as they first appear). Child and parent lists are
/// resolved once at build time, in edge-list order; endpoints without a
/// config are skipped.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    root_key: String,
    nodes: Vec<AgentGraphNode>,
    positions: HashMap<String, usize>,
    edges: Vec<Edge>,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
    max_depth_limit: usize,
}

impl GraphIndex {
    /// Build an index, failing when the root has no config or is disabled.
    ///
    /// Keys that appear in `edges` but have no entry in `configs` get no
    /// node. Configs for keys that no edge references (other than the root)
    /// are dropped.
    pub fn try_build(
        root_key: impl Into<String>,
        edges: Vec<Edge>,
        mut configs: HashMap<String, AgentConfig>,
    ) -> Result<Self> {
        let root_key = root_key.into();
        match configs.get(&root_key) {
            None => return Err(GraphError::RootUnresolved(root_key)),
            Some(config) if !config.enabled => return Err(GraphError::RootDisabled(root_key)),
            Some(_) => {}
        }

        let referenced = std::iter::once(root_key.as_str()).chain(
            edges
                .iter()
                .flat_map(|e| [e.source_key(), e.target_key()]),
        );

        let mut nodes = Vec::new();
        let mut positions = HashMap::new();
        for key in referenced {
            if positions.contains_key(key) {
                continue;
            }
            let Some(config) = configs.remove(key) else {
                debug!(node_key = %key, "No config for referenced node, skipping");
                continue;
            };
            let outgoing = edges
                .iter()
                .filter(|e| e.source_key() == key)
                .cloned()
                .collect();
            positions.insert(key.to_string(), nodes.len());
            nodes.push(AgentGraphNode::new(key, config, outgoing));
        }

        let mut children = vec![Vec::new(); nodes.len()];
        let mut parents = vec![Vec::new(); nodes.len()];
        for edge in &edges {
            let source = positions.get(edge.source_key());
            let target = positions.get(edge.target_key());
            if let (Some(&source), Some(&target)) = (source, target) {
                children[source].push(target);
                parents[target].push(source);
            }
        }

        debug!(
            root_key = %root_key,
            nodes = nodes.len(),
            edges = edges.len(),
            "Built graph index"
        );

        Ok(Self {
            root_key,
            nodes,
            positions,
            edges,
            children,
            parents,
            max_depth_limit: DEFAULT_MAX_DEPTH_LIMIT,
        })
    }

    /// Build an index, returning an invalid (empty) one when the root is
    /// missing or disabled. Traversals over an invalid index are no-ops.
    pub fn build(
        root_key: impl Into<String>,
        edges: Vec<Edge>,
        configs: HashMap<String, AgentConfig>,
    ) -> Self {
        let root_key = root_key.into();
        match Self::try_build(root_key.clone(), edges, configs) {
            Ok(index) => index,
            Err(e) => {
                warn!(root_key = %root_key, error = %e, "Graph root unavailable, graph is not traversable");
                Self::invalid(root_key)
            }
        }
    }

    /// An index with no nodes. `root()` returns `None`.
    pub fn invalid(root_key: impl Into<String>) -> Self {
        Self {
            root_key: root_key.into(),
            nodes: Vec::new(),
            positions: HashMap::new(),
            edges: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
            max_depth_limit: DEFAULT_MAX_DEPTH_LIMIT,
        }
    }

    /// Override the depth safety bound used by forward traversal.
    pub fn with_max_depth_limit(mut self, limit: usize) -> Self {
        self.max_depth_limit = limit.max(1);
        self
    }

    pub fn max_depth_limit(&self) -> usize {
        self.max_depth_limit
    }

    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// The root node, or `None` when the index is invalid.
    pub fn root(&self) -> Option<&AgentGraphNode> {
        self.get_node(&self.root_key)
    }

    pub fn is_valid(&self) -> bool {
        self.root().is_some()
    }

    pub fn get_node(&self, key: &str) -> Option<&AgentGraphNode> {
        self.positions.get(key).map(|&pos| &self.nodes[pos])
    }

    /// Targets of `key`'s outgoing edges, in edge-list order.
    pub fn get_child_nodes(&self, key: &str) -> Vec<&AgentGraphNode> {
        self.positions
            .get(key)
            .map(|&pos| self.resolve(&self.children[pos]))
            .unwrap_or_default()
    }

    /// Sources of `key`'s incoming edges, in edge-list order.
    pub fn get_parent_nodes(&self, key: &str) -> Vec<&AgentGraphNode> {
        self.positions
            .get(key)
            .map(|&pos| self.resolve(&self.parents[pos]))
            .unwrap_or_default()
    }

    /// Nodes with no resolvable children, in insertion order.
    pub fn terminal_nodes(&self) -> Vec<&AgentGraphNode> {
        self.resolve(&self.terminal_positions())
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &AgentGraphNode> {
        self.nodes.iter()
    }

    /// The full edge list in declaration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub(crate) fn node_at(&self, pos: usize) -> &AgentGraphNode {
        &self.nodes[pos]
    }

    pub(crate) fn child_positions(&self, pos: usize) -> &[usize] {
        &self.children[pos]
    }

    pub(crate) fn parent_positions(&self, pos: usize) -> &[usize] {
        &self.parents[pos]
    }

    pub(crate) fn terminal_positions(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&pos| self.children[pos].is_empty())
            .collect()
    }

    fn resolve(&self, positions: &[usize]) -> Vec<&AgentGraphNode> {
        positions.iter().map(|&pos| &self.nodes[pos]).collect()
    }
}
