use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    // Graph construction errors
    #[error("Graph has no root key")]
    RootMissing,

    #[error("Root node has no config: {0}")]
    RootUnresolved(String),

    #[error("Root node is disabled: {0}")]
    RootDisabled(String),

    #[error("Graph is disabled: {0}")]
    GraphDisabled(String),

    #[error("Graph {graph} references disabled agent: {agent}")]
    AgentDisabled { graph: String, agent: String },

    // Traversal errors
    #[error("Visitor failed at node {node}: {message}")]
    Visitor { node: String, message: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GraphError {
    /// Wrap a visitor failure for the node that produced it.
    pub fn visitor(node: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Visitor {
            node: node.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
