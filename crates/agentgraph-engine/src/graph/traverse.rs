use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use agentgraph_core::error::Result;
use agentgraph_core::types::RunId;

use super::context::ExecutionContext;
use super::index::GraphIndex;
use super::node::AgentGraphNode;
use super::order::{forward_levels, reverse_levels, Level};

/// Which way a traversal walks the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Root first, deepest nodes last.
    Forward,
    /// Terminal nodes first, root last.
    Reverse,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// One step of a traversal plan: nodes visited together, in order.
///
/// For forward plans `rank` is the node depth; for reverse plans it counts
/// levels up from the terminal nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalLevel {
    pub rank: usize,
    pub keys: Vec<String>,
}

/// Async visitor, awaited once per node.
///
/// The node and the context are borrowed for the duration of the returned
/// future. The traversal does not start the next visit until it resolves.
pub trait NodeVisitor<V>: Send {
    fn visit<'a>(
        &'a mut self,
        node: &'a AgentGraphNode,
        context: &'a ExecutionContext<V>,
    ) -> BoxFuture<'a, Result<V>>;
}

/// Outcome of a traversal.
#[derive(Debug, Clone)]
pub struct TraversalResult<V> {
    run_id: RunId,
    root_key: String,
    direction: Direction,
    order: Vec<String>,
    context: ExecutionContext<V>,
    elapsed_ms: u64,
}

impl<V> TraversalResult<V> {
    /// The root's entry in the context: the headline result.
    pub fn result(&self) -> Option<&V> {
        self.context.get(&self.root_key)
    }

    pub fn into_result(self) -> Option<V> {
        let mut data = self.context.into_inner();
        data.remove(&self.root_key)
    }

    pub fn context(&self) -> &ExecutionContext<V> {
        &self.context
    }

    pub fn into_context(self) -> ExecutionContext<V> {
        self.context
    }

    /// Keys of visited nodes, in visit order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// True when no node was visited.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

/// Bookkeeping shared by the sync and async drivers.
struct Run<V> {
    run_id: RunId,
    direction: Direction,
    start: Instant,
    seen: HashSet<usize>,
    order: Vec<String>,
    context: ExecutionContext<V>,
}

impl<V> Run<V> {
    fn start(index: &GraphIndex, direction: Direction, plan: &[Level], context: ExecutionContext<V>) -> Self {
        let run_id = RunId::new();
        let planned: usize = plan.iter().map(|l| l.nodes.len()).sum();
        if plan.is_empty() {
            debug!(
                run_id = %run_id,
                root_key = %index.root_key(),
                %direction,
                "Nothing to traverse"
            );
        } else {
            info!(
                run_id = %run_id,
                root_key = %index.root_key(),
                %direction,
                nodes = planned,
                levels = plan.len(),
                "Starting graph traversal"
            );
        }
        Self {
            run_id,
            direction,
            start: Instant::now(),
            seen: HashSet::with_capacity(planned),
            order: Vec::with_capacity(planned),
            context,
        }
    }

    /// Claim a node for visiting; false if it was already visited.
    fn claim(&mut self, pos: usize, node: &AgentGraphNode, rank: usize) -> bool {
        if !self.seen.insert(pos) {
            return false;
        }
        debug!(run_id = %self.run_id, node_key = %node.key(), rank, "Visiting graph node");
        true
    }

    fn record(&mut self, node: &AgentGraphNode, value: V) {
        self.context.insert(node.key(), value);
        self.order.push(node.key().to_string());
    }

    fn finish(self, index: &GraphIndex) -> TraversalResult<V> {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        if !self.order.is_empty() {
            info!(
                run_id = %self.run_id,
                direction = %self.direction,
                visited = self.order.len(),
                elapsed_ms,
                "Graph traversal complete"
            );
        }
        TraversalResult {
            run_id: self.run_id,
            root_key: index.root_key().to_string(),
            direction: self.direction,
            order: self.order,
            context: self.context,
            elapsed_ms,
        }
    }
}

impl GraphIndex {
    fn plan(&self, direction: Direction) -> Vec<Level> {
        match direction {
            Direction::Forward => forward_levels(self),
            Direction::Reverse => reverse_levels(self),
        }
    }

    /// The visitation plan for `direction`, as levels of node keys.
    pub fn levels(&self, direction: Direction) -> Vec<TraversalLevel> {
        self.plan(direction)
            .into_iter()
            .map(|level| TraversalLevel {
                rank: level.rank,
                keys: level
                    .nodes
                    .iter()
                    .map(|&pos| self.node_at(pos).key().to_string())
                    .collect(),
            })
            .collect()
    }

    /// Forward plan: nodes grouped by longest-path depth from the root.
    pub fn forward_levels(&self) -> Vec<TraversalLevel> {
        self.levels(Direction::Forward)
    }

    /// Reverse plan: terminal nodes first, root last.
    pub fn reverse_levels(&self) -> Vec<TraversalLevel> {
        self.levels(Direction::Reverse)
    }

    /// Visit nodes from the root down, deepest nodes last.
    ///
    /// For every edge `u -> v` within the depth limit, `u` is visited (and its
    /// result stored in the context) before `v`. Returns immediately, with no
    /// visits, when the root is unavailable.
    pub fn traverse<V, F>(&self, mut visitor: F, context: ExecutionContext<V>) -> TraversalResult<V>
    where
        F: FnMut(&AgentGraphNode, &ExecutionContext<V>) -> V,
    {
        let result = self.try_traverse(
            |node, ctx| Ok::<V, Infallible>(visitor(node, ctx)),
            context,
        );
        match result {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Visit nodes from the terminal nodes up to the root, root last.
    ///
    /// A node is visited only after every child that leads to a terminal
    /// node. Returns immediately when the graph has no terminal nodes.
    pub fn reverse_traverse<V, F>(
        &self,
        mut visitor: F,
        context: ExecutionContext<V>,
    ) -> TraversalResult<V>
    where
        F: FnMut(&AgentGraphNode, &ExecutionContext<V>) -> V,
    {
        let result = self.try_reverse_traverse(
            |node, ctx| Ok::<V, Infallible>(visitor(node, ctx)),
            context,
        );
        match result {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Fallible [`traverse`](Self::traverse). The first visitor error stops
    /// the traversal and is returned as-is.
    pub fn try_traverse<V, E, F>(
        &self,
        visitor: F,
        context: ExecutionContext<V>,
    ) -> std::result::Result<TraversalResult<V>, E>
    where
        F: FnMut(&AgentGraphNode, &ExecutionContext<V>) -> std::result::Result<V, E>,
    {
        self.drive(Direction::Forward, visitor, context)
    }

    /// Fallible [`reverse_traverse`](Self::reverse_traverse).
    pub fn try_reverse_traverse<V, E, F>(
        &self,
        visitor: F,
        context: ExecutionContext<V>,
    ) -> std::result::Result<TraversalResult<V>, E>
    where
        F: FnMut(&AgentGraphNode, &ExecutionContext<V>) -> std::result::Result<V, E>,
    {
        self.drive(Direction::Reverse, visitor, context)
    }

    /// [`traverse`](Self::traverse) with an async visitor.
    pub async fn traverse_async<V, T>(
        &self,
        visitor: &mut T,
        context: ExecutionContext<V>,
    ) -> Result<TraversalResult<V>>
    where
        T: NodeVisitor<V> + ?Sized,
        V: Send + Sync,
    {
        self.drive_async(Direction::Forward, visitor, context).await
    }

    /// [`reverse_traverse`](Self::reverse_traverse) with an async visitor.
    pub async fn reverse_traverse_async<V, T>(
        &self,
        visitor: &mut T,
        context: ExecutionContext<V>,
    ) -> Result<TraversalResult<V>>
    where
        T: NodeVisitor<V> + ?Sized,
        V: Send + Sync,
    {
        self.drive_async(Direction::Reverse, visitor, context).await
    }

    fn drive<V, E, F>(
        &self,
        direction: Direction,
        mut visitor: F,
        context: ExecutionContext<V>,
    ) -> std::result::Result<TraversalResult<V>, E>
    where
        F: FnMut(&AgentGraphNode, &ExecutionContext<V>) -> std::result::Result<V, E>,
    {
        let plan = self.plan(direction);
        let mut run = Run::start(self, direction, &plan, context);

        for level in &plan {
            for &pos in &level.nodes {
                let node = self.node_at(pos);
                if !run.claim(pos, node, level.rank) {
                    continue;
                }
                let value = visitor(node, &run.context)?;
                run.record(node, value);
            }
        }

        Ok(run.finish(self))
    }

    async fn drive_async<V, T>(
        &self,
        direction: Direction,
        visitor: &mut T,
        context: ExecutionContext<V>,
    ) -> Result<TraversalResult<V>>
    where
        T: NodeVisitor<V> + ?Sized,
        V: Send + Sync,
    {
        let plan = self.plan(direction);
        let mut run = Run::start(self, direction, &plan, context);

        for level in &plan {
            for &pos in &level.nodes {
                let node = self.node_at(pos);
                if !run.claim(pos, node, level.rank) {
                    continue;
                }
                let value = visitor.visit(node, &run.context).await?;
                run.record(node, value);
            }
        }

        Ok(run.finish(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgraph_core::error::GraphError;
    use crate::graph::index::tests::index;

    fn depth_three() -> GraphIndex {
        index(
            "customer-support-agent",
            &[
                ("customer-support-agent", "personalized-agent"),
                ("customer-support-agent", "minimal-agent"),
                ("personalized-agent", "multi-context-agent"),
                ("multi-context-agent", "minimal-agent"),
            ],
        )
    }

    fn diamond() -> GraphIndex {
        index("r", &[("r", "a"), ("r", "b"), ("a", "c"), ("b", "c")])
    }

    /// Visitor that checks every earlier result is visible, then tags the node.
    fn tagging(
        order: &mut Vec<String>,
    ) -> impl FnMut(&AgentGraphNode, &ExecutionContext<String>) -> String + '_ {
        move |node: &AgentGraphNode, ctx: &ExecutionContext<String>| {
            for previous in order.iter() {
                assert_eq!(ctx.get(previous), Some(&format!("{}-test", previous)));
            }
            order.push(node.key().to_string());
            format!("{}-test", node.key())
        }
    }

    #[test]
    fn test_traverse_depth_three() {
        let graph = depth_three();
        let mut order = Vec::new();
        let result = graph.traverse(tagging(&mut order), ExecutionContext::new());

        assert_eq!(
            order,
            vec![
                "customer-support-agent",
                "personalized-agent",
                "multi-context-agent",
                "minimal-agent",
            ]
        );
        assert_eq!(result.order(), order.as_slice());
        assert_eq!(result.result(), Some(&"customer-support-agent-test".to_string()));
        assert_eq!(result.direction(), Direction::Forward);
        assert_eq!(result.context().len(), 4);
    }

    #[test]
    fn test_reverse_traverse_depth_three() {
        let graph = depth_three();
        let mut order = Vec::new();
        let result = graph.reverse_traverse(tagging(&mut order), ExecutionContext::new());

        assert_eq!(
            order,
            vec![
                "minimal-agent",
                "multi-context-agent",
                "personalized-agent",
                "customer-support-agent",
            ]
        );
        assert_eq!(result.into_result(), Some("customer-support-agent-test".to_string()));
    }

    #[test]
    fn test_diamond_forward_visits_join_once() {
        let graph = diamond();
        let result = graph.traverse(|node, _| node.key().to_string(), ExecutionContext::new());
        assert_eq!(result.order(), &["r", "a", "b", "c"]);
    }

    #[test]
    fn test_diamond_reverse_root_last() {
        let graph = diamond();
        let result =
            graph.reverse_traverse(|node, _| node.key().to_string(), ExecutionContext::new());
        assert_eq!(result.order(), &["c", "a", "b", "r"]);
    }

    #[test]
    fn test_reverse_visitor_sees_children() {
        let graph = diamond();
        let result = graph.reverse_traverse(
            |node, ctx: &ExecutionContext<usize>| {
                // Each node counts itself plus the results of its children.
                1 + node
                    .edges()
                    .iter()
                    .map(|e| ctx.get(e.target_key()).copied().unwrap_or(0))
                    .sum::<usize>()
            },
            ExecutionContext::new(),
        );
        // c = 1, a = b = 2, r = 5
        assert_eq!(result.result(), Some(&5));
    }

    #[test]
    fn test_initial_context_is_visible() {
        let graph = diamond();
        let mut seed = ExecutionContext::new();
        seed.insert("input", "hello".to_string());

        let result = graph.traverse(
            |node, ctx| format!("{}:{}", node.key(), ctx.get("input").unwrap()),
            seed,
        );
        assert_eq!(result.result(), Some(&"r:hello".to_string()));
        assert_eq!(result.context().len(), 5);
    }

    #[test]
    fn test_invalid_graph_is_noop() {
        let graph = GraphIndex::invalid("root");
        let mut calls = 0;
        let result = graph.traverse(
            |_, _| {
                calls += 1;
            },
            ExecutionContext::new(),
        );
        assert!(result.is_empty());
        assert!(result.result().is_none());

        let result = graph.reverse_traverse(|_, _| calls += 1, ExecutionContext::new());
        assert!(result.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_try_traverse_stops_at_first_error() {
        let graph = diamond();
        let mut visited = Vec::new();
        let err = graph
            .try_traverse(
                |node, _| {
                    visited.push(node.key().to_string());
                    if node.key() == "a" {
                        Err(GraphError::visitor("a", "boom"))
                    } else {
                        Ok(())
                    }
                },
                ExecutionContext::new(),
            )
            .unwrap_err();

        assert!(matches!(err, GraphError::Visitor { ref node, .. } if node == "a"));
        assert_eq!(visited, vec!["r", "a"]);
    }

    #[test]
    fn test_levels_by_key() {
        let graph = diamond();
        assert_eq!(
            graph.forward_levels(),
            vec![
                TraversalLevel { rank: 0, keys: vec!["r".into()] },
                TraversalLevel { rank: 1, keys: vec!["a".into(), "b".into()] },
                TraversalLevel { rank: 2, keys: vec!["c".into()] },
            ]
        );
        assert_eq!(graph.reverse_levels().last().unwrap().keys, vec!["r"]);
    }

    struct Echo {
        calls: usize,
    }

    impl NodeVisitor<String> for Echo {
        fn visit<'a>(
            &'a mut self,
            node: &'a AgentGraphNode,
            context: &'a ExecutionContext<String>,
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move {
                self.calls += 1;
                tokio::task::yield_now().await;
                let upstream: Vec<&str> = context.keys().collect();
                Ok(format!("{}<{}", node.key(), upstream.len()))
            })
        }
    }

    #[tokio::test]
    async fn test_traverse_async() {
        let graph = diamond();
        let mut visitor = Echo { calls: 0 };
        let result = graph
            .traverse_async(&mut visitor, ExecutionContext::new())
            .await
            .unwrap();

        assert_eq!(visitor.calls, 4);
        assert_eq!(result.order(), &["r", "a", "b", "c"]);
        // Each visit saw exactly the results stored before it.
        assert_eq!(result.context().get("r"), Some(&"r<0".to_string()));
        assert_eq!(result.context().get("c"), Some(&"c<3".to_string()));
    }

    #[tokio::test]
    async fn test_reverse_traverse_async() {
        let graph = diamond();
        let mut visitor = Echo { calls: 0 };
        let result = graph
            .reverse_traverse_async(&mut visitor, ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(result.order(), &["c", "a", "b", "r"]);
        assert_eq!(result.result(), Some(&"r<3".to_string()));
    }

    struct Failing;

    impl NodeVisitor<()> for Failing {
        fn visit<'a>(
            &'a mut self,
            node: &'a AgentGraphNode,
            _context: &'a ExecutionContext<()>,
        ) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move { Err(GraphError::visitor(node.key(), "provider unavailable")) })
        }
    }

    #[tokio::test]
    async fn test_async_error_propagates() {
        let graph = diamond();
        let err = graph
            .traverse_async(&mut Failing, ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Visitor { ref node, .. } if node == "r"));
    }
}
