//! In-memory node store with write-through snapshot persistence.
//!
//! Nodes live in insertion order (never removed) with an id -> position index.
//! Tree structure is `parent_id` + `children`; citation edges are handled in
//! `citations.rs` and tree queries in `hierarchy.rs`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::db::{self, Node, SmartAskResult, Storage};
use crate::error::{GraphError, Result};
use crate::utils::one_line;

const ID_LEN: usize = 8;
const PREVIEW_CHARS: usize = 80;
const DESCRIBE_CHARS: usize = 60;

pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    last_smart_ask: Option<SmartAskResult>,
    storage: Storage,
}

impl Graph {
    /// Open a graph on the given storage, loading whatever is there.
    pub fn open(storage: Storage) -> Self {
        let state = storage.load();
        let graph = Self::from_state(state, storage);
        for issue in graph.integrity_issues() {
            tracing::warn!(issue = %issue, "loaded graph is inconsistent");
        }
        graph
    }

    /// Ephemeral graph; nothing survives the process.
    pub fn in_memory() -> Self {
        Self::open(Storage::Memory)
    }

    fn from_state(state: db::GraphState, storage: Storage) -> Self {
        let index = state
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        Self {
            nodes: state.nodes,
            index,
            last_smart_ask: state.last_smart_ask,
            storage,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Like `get`, but unknown ids are an error.
    pub fn node(&self, id: &str) -> Result<&Node> {
        self.get(id).ok_or_else(|| GraphError::node_not_found(id))
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Result<&mut Node> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.nodes[i]),
            None => Err(GraphError::node_not_found(id)),
        }
    }


    pub fn roots(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.is_root())
            .map(|n| n.id.clone())
            .collect()
    }

    // ==================== Creation ====================

    fn generate_id(&self) -> String {
        loop {
            let candidate = uuid::Uuid::new_v4().simple().to_string()[..ID_LEN].to_string();
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Fresh, unlinked node with a new id. Hand it back through `add_node`.
    pub(crate) fn draft(&self, prompt: &str, parent_id: Option<&str>) -> Node {
        Node::new(self.generate_id(), prompt.to_string(), parent_id.map(str::to_string))
    }

    /// Link a drafted node into the tree and persist.
    pub(crate) fn add_node(&mut self, mut node: Node) -> Result<String> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::State(format!("node id {} already in use", node.id)));
        }
        if let Some(ref parent_id) = node.parent_id {
            if !self.index.contains_key(parent_id) {
                return Err(GraphError::node_not_found(parent_id));
            }
        }
        node.children.clear();

        let id = node.id.clone();
        let parent_id = node.parent_id.clone();
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);

        if let Some(parent_id) = parent_id {
            let parent = self.node_mut(&parent_id)?;
            parent.children.push(id.clone());
            parent.touch();
        }

        tracing::debug!(id = %id, "node created");
        self.persist()?;
        Ok(id)
    }

    /// New thread root with an empty response.
    pub fn create_root(&mut self, prompt: &str) -> Result<String> {
        let node = self.draft(prompt, None);
        self.add_node(node)
    }

    /// New child of `parent_id`, appended to the parent's children.
    pub fn create_reply(&mut self, parent_id: &str, prompt: &str) -> Result<String> {
        if !self.contains(parent_id) {
            return Err(GraphError::node_not_found(parent_id));
        }
        let node = self.draft(prompt, Some(parent_id));
        self.add_node(node)
    }

    // ==================== Mutation ====================

    pub fn edit_response(&mut self, id: &str, text: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        node.response = text.to_string();
        node.touch();
        self.persist()
    }

    pub fn set_prompt(&mut self, id: &str, text: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        node.prompt = text.to_string();
        node.touch();
        self.persist()
    }

    pub fn set_comment(&mut self, id: &str, text: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        node.comment = Some(text.to_string());
        node.touch();
        self.persist()
    }

    /// Adding a tag that is already present is a no-op.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.has_tag(tag) {
            return Ok(());
        }
        node.tags.push(tag.to_string());
        node.touch();
        self.persist()
    }

    /// Removing an absent tag is a no-op.
    pub fn remove_tag(&mut self, id: &str, tag: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        if !node.has_tag(tag) {
            return Ok(());
        }
        node.tags.retain(|t| t != tag);
        node.touch();
        self.persist()
    }

    pub(crate) fn set_embedding(&mut self, id: &str, embedding: Vec<f32>) -> Result<()> {
        let node = self.node_mut(id)?;
        node.embedding = Some(embedding);
        self.persist()
    }

    pub(crate) fn set_summary(&mut self, id: &str, summary: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        node.summary = Some(summary.to_string());
        self.persist()
    }

    // ==================== Smart-ask cache ====================

    pub fn last_smart_ask(&self) -> Option<&SmartAskResult> {
        self.last_smart_ask.as_ref()
    }

    /// Replace the cached smart-ask result (no history kept).
    pub(crate) fn set_last_smart_ask(&mut self, result: SmartAskResult) -> Result<()> {
        self.last_smart_ask = Some(result);
        self.persist()
    }

    // ==================== Persistence ====================

    /// Write the full snapshot to the configured storage.
    pub fn persist(&self) -> Result<()> {
        self.storage.save(&self.nodes, self.last_smart_ask.as_ref())
    }

    /// Write a snapshot somewhere other than the configured storage.
    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        db::save(path, &self.nodes, self.last_smart_ask.as_ref())?;
        tracing::info!(path = %path.display(), nodes = self.nodes.len(), "exported graph");
        Ok(())
    }

    /// Replace the in-memory graph with a snapshot file and persist it to the
    /// configured storage. A file that does not parse, or holds no nodes, is
    /// rejected and the current graph is left untouched.
    pub fn import_from_file(&mut self, path: &Path) -> Result<usize> {
        if !path.is_file() {
            return Err(GraphError::NotFound(format!("file {}", path.display())));
        }
        let state = db::parse(&fs::read_to_string(path)?).map_err(|e| {
            GraphError::InvalidInput(format!("cannot import {}: {}", path.display(), e))
        })?;
        if state.nodes.is_empty() {
            return Err(GraphError::InvalidInput(format!(
                "no data imported: {} contains no nodes",
                path.display()
            )));
        }

        let storage = std::mem::replace(&mut self.storage, Storage::Memory);
        *self = Self::from_state(state, storage);
        for issue in self.integrity_issues() {
            tracing::warn!(issue = %issue, "imported graph is inconsistent");
        }
        self.persist()?;
        tracing::info!(path = %path.display(), nodes = self.nodes.len(), "imported graph");
        Ok(self.nodes.len())
    }

    // ==================== Lookup ====================

    /// Case-insensitive substring match over prompt, response, comment and tags.
    pub fn search(&self, term: &str) -> Vec<String> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.nodes
            .iter()
            .filter(|n| {
                n.prompt.to_lowercase().contains(&needle)
                    || n.response.to_lowercase().contains(&needle)
                    || n.comment.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle))
                    || n.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn preview(&self, id: &str) -> String {
        match self.get(id) {
            Some(node) => format!("[{}] {}", id, one_line(&node.prompt, PREVIEW_CHARS)),
            None => format!("[{}] (not found)", id),
        }
    }

    /// One line per known id; unknown ids are skipped.
    pub fn describe(&self, ids: &[String]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.get(id))
            .map(|n| format!("[{}] {}...", n.id, one_line(&n.prompt, DESCRIBE_CHARS)))
            .collect()
    }

    /// Structural problems: dangling parents, children lists that disagree
    /// with `parent_id`, unknown citation targets, citation cycles.
    pub fn integrity_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for node in &self.nodes {
            if let Some(ref parent_id) = node.parent_id {
                match self.get(parent_id) {
                    None => issues.push(format!("{} has unknown parent {}", node.id, parent_id)),
                    Some(parent) => {
                        let count = parent.children.iter().filter(|c| **c == node.id).count();
                        if count != 1 {
                            issues.push(format!(
                                "{} listed {} times in children of {}",
                                node.id, count, parent_id
                            ));
                        }
                    }
                }
            }
            for child_id in &node.children {
                let linked = self
                    .get(child_id)
                    .is_some_and(|c| c.parent_id.as_deref() == Some(node.id.as_str()));
                if !linked {
                    issues.push(format!("{} lists {} as child but it is not", node.id, child_id));
                }
            }
            for cited in &node.citations {
                if !self.contains(cited) {
                    issues.push(format!("{} cites unknown node {}", node.id, cited));
                } else if self.citation_path_exists(cited, &node.id) {
                    issues.push(format!("citation {} -> {} is part of a cycle", node.id, cited));
                }
            }
        }

        issues
    }
}
