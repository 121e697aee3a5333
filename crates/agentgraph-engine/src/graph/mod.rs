//! Agent graph engine: handoff graphs between agents and the order in which
//! to visit them.
//!
//! A graph is a set of `AgentGraphNode`s, one per agent key, connected by
//! `Edge`s that carry opaque handoff payloads. The `GraphIndex` is built once
//! from a root key, an ordered edge list and the resolved agent configs.
//!
//! Two traversals thread an `ExecutionContext` through a caller-supplied
//! visitor:
//! - forward: root first, each node after every ancestor on its longest path
//!   (bounded by a depth limit so cycles terminate);
//! - reverse: terminal nodes first, each node after all of its children,
//!   root last.

pub mod context;
pub mod definition;
pub mod document;
pub mod edge;
pub mod index;
pub mod node;
mod order;
pub mod traverse;

pub use context::ExecutionContext;
pub use definition::AgentGraph;
pub use document::{EdgeGroups, GraphDocument, HandoffTarget};
pub use edge::Edge;
pub use index::{GraphIndex, DEFAULT_MAX_DEPTH_LIMIT};
pub use node::AgentGraphNode;
pub use traverse::{Direction, NodeVisitor, TraversalLevel, TraversalResult};
