pub mod graph;

pub use graph::{
    AgentGraph, AgentGraphNode, Direction, Edge, ExecutionContext, GraphDocument, GraphIndex,
    NodeVisitor, TraversalLevel, TraversalResult,
};
