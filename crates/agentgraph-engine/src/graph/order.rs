//! Visitation order for forward and reverse traversal.
//!
//! Both orders depend only on graph structure, never on visitor output, so
//! they are computed up front as a list of levels of node positions.

use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::{debug, warn};

use super::index::GraphIndex;

/// A group of node positions visited together, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Level {
    pub rank: usize,
    pub nodes: Vec<usize>,
}

/// Longest-path depth of every node reachable from the root.
#[derive(Debug, Clone)]
pub(crate) struct DepthMap {
    /// Recorded depth per node position; `None` for nodes never given one.
    pub depths: Vec<Option<usize>>,
    /// Depth assigned to nodes reached only past the limit.
    pub overflow_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Depth-first walk from the root, following children in edge-list order.
#[derive(Debug, Clone)]
pub(crate) struct DfsTree {
    pub root: usize,
    /// Reachable nodes in preorder.
    pub preorder: Vec<usize>,
    /// `(source, target)` pairs whose target was still on the walk stack.
    /// Self-loops and edges back into the root always land here.
    pub back_edges: HashSet<(usize, usize)>,
}

impl DfsTree {
    pub fn is_back_edge(&self, source: usize, target: usize) -> bool {
        self.back_edges.contains(&(source, target))
    }
}

pub(crate) fn depth_first(index: &GraphIndex, root: usize) -> DfsTree {
    let mut marks = vec![Mark::New; index.len()];
    let mut preorder = vec![root];
    let mut back_edges = HashSet::new();
    let mut stack = vec![(root, 0usize)];
    marks[root] = Mark::Active;

    while let Some(&(node, next)) = stack.last() {
        let Some(&child) = index.child_positions(node).get(next) else {
            marks[node] = Mark::Done;
            stack.pop();
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.1 += 1;
        }
        match marks[child] {
            Mark::New => {
                marks[child] = Mark::Active;
                preorder.push(child);
                stack.push((child, 0));
            }
            Mark::Active => {
                back_edges.insert((node, child));
            }
            Mark::Done => {}
        }
    }

    DfsTree {
        root,
        preorder,
        back_edges,
    }
}

/// Assign each node reachable from the root the length of the longest path
/// to it, bounded by `limit`.
///
/// Expansion goes level by level over every edge except the back edges of
/// `tree`, so a loop can never push depths up on its own. A child's depth is
/// raised whenever it is reached at a deeper level, and a raised child is
/// expanded again so its descendants move down with it. Past `limit`
/// nothing is recorded; unseen nodes are still expanded once so that
/// everything reachable is found.
pub(crate) fn compute_depths(index: &GraphIndex, tree: &DfsTree, limit: usize) -> DepthMap {
    let n = index.len();
    let root = tree.root;
    let mut depths = vec![None; n];
    let mut seen = vec![false; n];
    depths[root] = Some(0);
    seen[root] = true;

    let mut frontier = vec![root];
    let mut level = 0;
    let mut max_encountered = 0;

    while !frontier.is_empty() {
        level += 1;
        let mut next = Vec::new();
        let mut queued = vec![false; n];

        for &node in &frontier {
            for &child in index.child_positions(node) {
                if tree.is_back_edge(node, child) {
                    continue;
                }
                max_encountered = max_encountered.max(level);
                let mut expand = !seen[child];

                if level <= limit && depths[child].map_or(true, |d| level > d) {
                    depths[child] = Some(level);
                    expand = true;
                }

                if expand && !queued[child] {
                    seen[child] = true;
                    queued[child] = true;
                    next.push(child);
                }
            }
        }

        frontier = next;
    }

    let overflow_depth = (limit + 1).max(max_encountered + 1);
    DepthMap {
        depths,
        overflow_depth,
    }
}

/// Forward order: every node reachable from the root, grouped by depth in
/// ascending order. Within a depth, nodes keep depth-first preorder.
pub(crate) fn forward_levels(index: &GraphIndex) -> Vec<Level> {
    let Some(root) = index.position(index.root_key()) else {
        return Vec::new();
    };

    let limit = index.max_depth_limit();
    let tree = depth_first(index, root);
    let depth_map = compute_depths(index, &tree, limit);

    let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut overflowed = 0;
    for &node in &tree.preorder {
        let depth = match depth_map.depths[node] {
            Some(depth) => depth,
            None => {
                overflowed += 1;
                depth_map.overflow_depth
            }
        };
        buckets.entry(depth).or_default().push(node);
    }

    if overflowed > 0 {
        warn!(
            root_key = %index.root_key(),
            limit,
            overflowed,
            overflow_depth = depth_map.overflow_depth,
            "Nodes past the depth limit deferred to the end of the traversal"
        );
    }

    buckets
        .into_iter()
        .map(|(rank, nodes)| Level { rank, nodes })
        .collect()
}

/// Strongly connected component id of every node position.
///
/// Iterative Tarjan over child links.
fn components(index: &GraphIndex) -> Vec<usize> {
    let n = index.len();
    let mut discovered: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut component = vec![0; n];
    let mut next_index = 0;
    let mut next_component = 0;

    for start in 0..n {
        if discovered[start].is_some() {
            continue;
        }
        discovered[start] = Some(next_index);
        low[start] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start] = true;
        let mut work = vec![(start, 0usize)];

        while let Some(&(node, next)) = work.last() {
            if let Some(&child) = index.child_positions(node).get(next) {
                if let Some(top) = work.last_mut() {
                    top.1 += 1;
                }
                match discovered[child] {
                    None => {
                        discovered[child] = Some(next_index);
                        low[child] = next_index;
                        next_index += 1;
                        stack.push(child);
                        on_stack[child] = true;
                        work.push((child, 0));
                    }
                    Some(at) if on_stack[child] => low[node] = low[node].min(at),
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                low[parent] = low[parent].min(low[node]);
            }
            if discovered[node] == Some(low[node]) {
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component[member] = next_component;
                    if member == node {
                        break;
                    }
                }
                next_component += 1;
            }
        }
    }

    component
}

/// Reverse order: terminal nodes first, then each node once all of its
/// children have been visited, with the root last.
///
/// Only nodes that lead to a terminal node take part. A node waits for its
/// distinct children among those, ignoring self-loops and edges back into
/// the root. When nothing is ready but nodes remain, the walk is stuck on a
/// cycle. The earliest discovered pending node that sits on a cycle and
/// waits only on members of that cycle is then released.
pub(crate) fn reverse_levels(index: &GraphIndex) -> Vec<Level> {
    let terminals = index.terminal_positions();
    if terminals.is_empty() {
        return Vec::new();
    }
    let n = index.len();
    let root = index.position(index.root_key());

    // Participants, in discovery order.
    let mut participant = vec![false; n];
    let mut discovered = Vec::new();
    let mut queue: VecDeque<usize> = terminals.iter().copied().collect();
    for &t in &terminals {
        participant[t] = true;
    }
    while let Some(node) = queue.pop_front() {
        discovered.push(node);
        for &parent in index.parent_positions(node) {
            if !participant[parent] {
                participant[parent] = true;
                queue.push_back(parent);
            }
        }
    }

    let mut waiting_on = vec![0usize; n];
    for &node in &discovered {
        waiting_on[node] = distinct(index.child_positions(node))
            .into_iter()
            .filter(|&child| child != node && Some(child) != root && participant[child])
            .count();
    }

    let mut visited = vec![false; n];
    let mut levels = Vec::new();
    let mut current = terminals;
    let mut root_reached = false;
    // Component ids and sizes, computed the first time the walk stalls.
    let mut cycles: Option<(Vec<usize>, Vec<usize>)> = None;

    loop {
        if current.is_empty() {
            let pending = |node: usize| !visited[node] && Some(node) != root;
            if !discovered.iter().any(|&node| pending(node)) {
                break;
            }
            let (component, component_size) = &*cycles.get_or_insert_with(|| {
                let component = components(index);
                let mut size = vec![0usize; n];
                for &id in &component {
                    size[id] += 1;
                }
                (component, size)
            });
            let waits_inside_cycle = |node: usize| {
                component_size[component[node]] > 1
                    && index.child_positions(node).iter().all(|&child| {
                        child == node
                            || Some(child) == root
                            || !participant[child]
                            || visited[child]
                            || component[child] == component[node]
                    })
            };
            let stuck = discovered
                .iter()
                .copied()
                .find(|&node| pending(node) && waits_inside_cycle(node))
                .or_else(|| discovered.iter().copied().find(|&node| pending(node)));
            match stuck {
                Some(node) => {
                    warn!(
                        node_key = %index.node_at(node).key(),
                        waiting_on = waiting_on[node],
                        "Reverse traversal blocked by a cycle, releasing node"
                    );
                    current = vec![node];
                }
                None => break,
            }
        }

        let mut level = Vec::new();
        let mut next = Vec::new();
        for node in current.drain(..) {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            if Some(node) == root {
                root_reached = true;
                continue;
            }
            level.push(node);

            for parent in distinct(index.parent_positions(node)) {
                if parent == node || visited[parent] {
                    continue;
                }
                waiting_on[parent] = waiting_on[parent].saturating_sub(1);
                if waiting_on[parent] == 0 {
                    next.push(parent);
                }
            }
        }

        if !level.is_empty() {
            debug!(rank = levels.len(), nodes = level.len(), "Reverse level ready");
            levels.push(Level {
                rank: levels.len(),
                nodes: level,
            });
        }
        current = next;
    }

    if let Some(root) = root {
        if root_reached || participant[root] {
            levels.push(Level {
                rank: levels.len(),
                nodes: vec![root],
            });
        }
    }

    levels
}

/// Positions with duplicates removed, first occurrence kept.
fn distinct(positions: &[usize]) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::with_capacity(positions.len());
    for &pos in positions {
        if !out.contains(&pos) {
            out.push(pos);
        }
    }
    out
}
