use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use agentgraph_core::error::Result;
use agentgraph_core::resolver::{AgentEntry, StaticResolver};

use super::edge::Edge;

/// A graph definition as stored or served: a root key plus the handoffs
/// leaving each agent.
///
/// ```json
/// {
///   "key": "support-graph",
///   "root": "triage",
///   "edges": {
///     "triage": [{ "key": "billing", "handoff": { "reason": "refund" } }]
///   }
/// }
/// ```
///
/// The `edges` table keeps document order; it decides child and parent
/// order in the built graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub edges: EdgeGroups,
    /// Optional inline agent configs, for offline use.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub agents: HashMap<String, AgentEntry>,
}

fn default_enabled() -> bool {
    true
}

/// Handoff targets for one source agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffTarget {
    pub key: String,
    #[serde(default = "empty_object")]
    pub handoff: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Ordered `source -> [targets]` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeGroups(Vec<(String, Vec<HandoffTarget>)>);

impl EdgeGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append targets for `source`, merging with an existing group.
    pub fn push(&mut self, source: impl Into<String>, target: HandoffTarget) {
        let source = source.into();
        match self.0.iter_mut().find(|(s, _)| *s == source) {
            Some((_, targets)) => targets.push(target),
            None => self.0.push((source, vec![target])),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[HandoffTarget])> {
        self.0.iter().map(|(s, t)| (s.as_str(), t.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for EdgeGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (source, targets) in &self.0 {
            map.serialize_entry(source, targets)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EdgeGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = EdgeGroups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of source agent keys to handoff target lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<EdgeGroups, A::Error> {
                let mut groups = EdgeGroups::new();
                while let Some((source, targets)) =
                    access.next_entry::<String, Vec<HandoffTarget>>()?
                {
                    for target in targets {
                        groups.push(source.clone(), target);
                    }
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

impl GraphDocument {
    /// A document with a root and no edges yet.
    pub fn new(key: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            root: Some(root.into()),
            enabled: true,
            edges: EdgeGroups::new(),
            agents: HashMap::new(),
        }
    }

    /// Builder: add a handoff from `source` to `target`.
    pub fn with_edge(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        handoff: serde_json::Value,
    ) -> Self {
        self.edges.push(
            source,
            HandoffTarget {
                key: target.into(),
                handoff,
            },
        );
        self
    }

    /// Parse a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Load from a `.toml` or `.json` file (anything else is read as JSON).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Flatten the edge table into the ordered edge list.
    pub fn edge_list(&self) -> Vec<Edge> {
        self.edges
            .iter()
            .flat_map(|(source, targets)| {
                targets
                    .iter()
                    .map(move |t| Edge::new(source, t.key.clone(), t.handoff.clone()))
            })
            .collect()
    }

    /// Every key the graph references: root first, then edge endpoints in
    /// declaration order, without duplicates.
    pub fn node_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let mut add = |key: &str| {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        };
        if let Some(root) = &self.root {
            add(root);
        }
        for (source, targets) in self.edges.iter() {
            add(source);
            for target in targets {
                add(&target.key);
            }
        }
        keys
    }

    /// Resolver over the inline `agents` table.
    pub fn inline_resolver(&self) -> StaticResolver {
        StaticResolver::from_entries(self.agents.clone())
    }
}
