//! Snapshot persistence for the conversation graph.
//!
//! The whole graph (nodes + cached smart-ask result) is written as one JSON
//! document after every mutation. Node maps keep insertion order on disk so
//! that a reload sees the nodes in the order they were created.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::models::{Node, SmartAskResult};
use crate::error::Result;

/// Where a graph lives. `Memory` never touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Memory,
    File(PathBuf),
}

impl Storage {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Storage::Memory => None,
            Storage::File(path) => Some(path),
        }
    }

    pub fn load(&self) -> GraphState {
        match self {
            Storage::Memory => GraphState::default(),
            Storage::File(path) => load(path),
        }
    }

    pub fn save(&self, nodes: &[Node], last_smart_ask: Option<&SmartAskResult>) -> Result<()> {
        match self {
            Storage::Memory => Ok(()),
            Storage::File(path) => save(path, nodes, last_smart_ask),
        }
    }
}

/// Everything that survives a save/load cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphState {
    pub nodes: Vec<Node>,
    pub last_smart_ask: Option<SmartAskResult>,
}

/// Load a snapshot. A missing file is a fresh graph; an unreadable or
/// malformed file is logged and also yields a fresh graph.
pub fn load(path: &Path) -> GraphState {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no snapshot yet, starting empty");
        return GraphState::default();
    }

    let parsed = fs::read_to_string(path)
        .map_err(crate::error::GraphError::from)
        .and_then(|content| parse(&content));

    match parsed {
        Ok(state) => {
            tracing::info!(path = %path.display(), nodes = state.nodes.len(), "loaded graph");
            state
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load graph, starting empty");
            GraphState::default()
        }
    }
}

/// Parse a snapshot document.
pub fn parse(content: &str) -> Result<GraphState> {
    let doc: SnapshotIn = serde_json::from_str(content)?;
    Ok(GraphState {
        nodes: doc.nodes.0,
        last_smart_ask: doc.last_smart_ask,
    })
}

/// Render a snapshot document.
pub fn render(nodes: &[Node], last_smart_ask: Option<&SmartAskResult>) -> Result<String> {
    let doc = SnapshotOut {
        nodes: NodeMapRef(nodes),
        last_smart_ask,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Write a snapshot: temp file in the same directory, then rename over the target.
pub fn save(path: &Path, nodes: &[Node], last_smart_ask: Option<&SmartAskResult>) -> Result<()> {
    let content = render(nodes, last_smart_ask)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)?;

    tracing::debug!(path = %path.display(), nodes = nodes.len(), "saved graph");
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "graph.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    nodes: NodeMapRef<'a>,
    last_smart_ask: Option<&'a SmartAskResult>,
}

#[derive(Deserialize)]
struct SnapshotIn {
    nodes: NodeMap,
    #[serde(default)]
    last_smart_ask: Option<SmartAskResult>,
}

/// Serializes a node slice as an id -> node object, in slice order.
struct NodeMapRef<'a>(&'a [Node]);

impl Serialize for NodeMapRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for node in self.0 {
            map.serialize_entry(&node.id, node)?;
        }
        map.end()
    }
}

/// Reads an id -> node object back into document order.
struct NodeMap(Vec<Node>);

impl<'de> Deserialize<'de> for NodeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NodeMapVisitor;

        impl<'de> Visitor<'de> for NodeMapVisitor {
            type Value = NodeMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of node id to node record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<NodeMap, A::Error> {
                let mut nodes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                let mut seen = HashSet::new();
                while let Some((key, node)) = access.next_entry::<String, Node>()? {
                    if !seen.insert(key.clone()) {
                        return Err(serde::de::Error::custom(format!("duplicate node id {}", key)));
                    }
                    if key != node.id {
                        return Err(serde::de::Error::custom(format!(
                            "node key {} does not match its id {}",
                            key, node.id
                        )));
                    }
                    nodes.push(node);
                }
                Ok(NodeMap(nodes))
            }
        }

        deserializer.deserialize_map(NodeMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_nodes() -> Vec<Node> {
        let mut root = Node::new("zz000001".to_string(), "Root".to_string(), None);
        let child = Node::new("aa000002".to_string(), "Child".to_string(), Some(root.id.clone()));
        root.children.push(child.id.clone());
        vec![root, child]
    }

    #[test]
    fn test_missing_file_is_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        let state = load(&dir.path().join("nope.json"));
        assert!(state.nodes.is_empty());
        assert!(state.last_smart_ask.is_none());
    }

    #[test]
    fn test_malformed_file_is_empty_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{"bad_json": true"#).unwrap();
        assert_eq!(load(&path), GraphState::default());
    }

    #[test]
    fn test_missing_nodes_key_is_corrupt() {
        assert!(parse(r#"{"last_smart_ask": null}"#).is_err());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_nodes.json");
        fs::write(&path, r#"{"something": {}}"#).unwrap();
        assert!(load(&path).nodes.is_empty());
    }

    #[test]
    fn test_mismatched_key_is_corrupt() {
        let doc = r#"{"nodes": {"a": {"id": "b", "parent_id": null, "prompt": "x"}}}"#;
        assert!(parse(doc).is_err());
    }

    #[test]
    fn test_duplicate_id_is_corrupt() {
        let doc = r#"{"nodes": {
            "a": {"id": "a", "parent_id": null, "prompt": "first"},
            "a": {"id": "a", "parent_id": null, "prompt": "second"}
        }}"#;
        assert!(parse(doc).is_err());
    }

    #[test]
    fn test_save_load_preserves_order_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.json");
        let nodes = sample_nodes();
        let cached = SmartAskResult {
            from_node_id: Some("zz000001".to_string()),
            question: "Why?".to_string(),
            response: "Because.".to_string(),
            citations: vec!["aa000002".to_string()],
        };

        save(&path, &nodes, Some(&cached)).unwrap();
        let state = load(&path);

        assert_eq!(state.nodes, nodes);
        assert_eq!(state.last_smart_ask, Some(cached));
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn test_memory_storage_never_writes() {
        let storage = Storage::Memory;
        storage.save(&sample_nodes(), None).unwrap();
        assert!(storage.load().nodes.is_empty());
        assert!(storage.path().is_none());
    }

    #[test]
    fn test_render_uses_node_map_layout() {
        let rendered = render(&sample_nodes(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(value["nodes"]["zz000001"].is_object());
        assert!(value["last_smart_ask"].is_null());
        // insertion order, not key order
        assert!(rendered.find("zz000001").unwrap() < rendered.find("aa000002").unwrap());
    }
}
