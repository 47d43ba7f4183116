//! Reply-tree queries: ancestors, descendants, subtree summaries, tree rendering.
//!
//! All traversals use explicit stacks so deep threads cannot overflow the
//! call stack.

use std::collections::HashSet;

use crate::error::Result;
use crate::graph::Graph;
use crate::utils::{one_line, truncate_chars};

/// Upper bound on a stored subtree summary, in characters.
pub const SUBTREE_SUMMARY_CHARS: usize = 1000;
const TREE_LINE_CHARS: usize = 60;

impl Graph {
    /// Parent, grandparent, ... up to the root. Empty for a root.
    pub fn ancestors(&self, id: &str) -> Result<Vec<String>> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.node(id)?;
        seen.insert(current.id.as_str());

        while let Some(ref parent_id) = current.parent_id {
            // a hand-edited file could loop; stop rather than spin
            if !seen.insert(parent_id.as_str()) {
                tracing::warn!(id, parent = %parent_id, "parent chain loops");
                break;
            }
            path.push(parent_id.clone());
            match self.get(parent_id) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(path)
    }

    /// Topmost ancestor, or the node itself when it is a root.
    pub fn root_of(&self, id: &str) -> Result<String> {
        Ok(self.ancestors(id)?.pop().unwrap_or_else(|| id.to_string()))
    }

    /// Depth-first pre-order over the reply tree, excluding `id` itself.
    pub fn descendants(&self, id: &str) -> Result<Vec<String>> {
        let mut subtree = self.subtree(id)?;
        subtree.remove(0);
        Ok(subtree)
    }

    /// Depth-first pre-order over the reply tree, starting with `id`.
    pub fn subtree(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.walk(id)?.into_iter().map(|(node_id, _)| node_id).collect())
    }

    /// Pre-order walk yielding (id, depth relative to `id`).
    fn walk(&self, id: &str) -> Result<Vec<(String, usize)>> {
        self.node(id)?;
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(id.to_string(), 0usize)];

        while let Some((current, depth)) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.get(&current) {
                for child in node.children.iter().rev() {
                    stack.push((child.clone(), depth + 1));
                }
            }
            order.push((current, depth));
        }

        Ok(order)
    }

    /// `prompt -> response` for every node in the subtree (pre-order),
    /// capped at `SUBTREE_SUMMARY_CHARS`, stored as the node's `subtree_summary`.
    pub fn summarize_subtree(&mut self, id: &str) -> Result<String> {
        let mut lines = Vec::new();
        for node_id in self.subtree(id)? {
            if let Some(node) = self.get(&node_id) {
                lines.push(format!("{} -> {}", node.prompt.trim(), node.response.trim()));
            }
        }
        let summary = truncate_chars(&lines.join("\n"), SUBTREE_SUMMARY_CHARS).to_string();

        let node = self.node_mut(id)?;
        node.subtree_summary = Some(summary.clone());
        node.touch();
        self.persist()?;
        Ok(summary)
    }

    /// Indented outline of the subtree rooted at `id`.
    pub fn render_tree(&self, id: &str) -> Result<String> {
        let mut out = String::new();
        for (node_id, depth) in self.walk(id)? {
            let prompt = self.get(&node_id).map(|n| n.prompt.as_str()).unwrap_or("");
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("[{}] {}\n", node_id, one_line(prompt, TREE_LINE_CHARS)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn test_chain_scenario() {
        let mut graph = Graph::in_memory();
        let a = graph.create_root("A").unwrap();
        let b = graph.create_reply(&a, "B").unwrap();
        let c = graph.create_reply(&b, "C").unwrap();

        assert_eq!(graph.descendants(&a).unwrap(), vec![b.clone(), c.clone()]);
        assert_eq!(graph.ancestors(&c).unwrap(), vec![b.clone(), a.clone()]);
        assert!(graph.ancestors(&a).unwrap().is_empty());
        assert_eq!(graph.root_of(&c).unwrap(), a);
    }

    #[test]
    fn test_descendants_preorder_with_branches() {
        let mut graph = Graph::in_memory();
        let root = graph.create_root("root").unwrap();
        let x = graph.create_reply(&root, "x").unwrap();
        let y = graph.create_reply(&root, "y").unwrap();
        let x1 = graph.create_reply(&x, "x1").unwrap();
        let y1 = graph.create_reply(&y, "y1").unwrap();
        let x2 = graph.create_reply(&x, "x2").unwrap();

        assert_eq!(graph.descendants(&root).unwrap(), vec![x, x1, x2, y, y1]);
    }

    #[test]
    fn test_deep_thread_does_not_overflow() {
        let mut graph = Graph::in_memory();
        let root = graph.create_root("0").unwrap();
        let mut last = root.clone();
        for i in 1..5000 {
            last = graph.create_reply(&last, &i.to_string()).unwrap();
        }
        assert_eq!(graph.descendants(&root).unwrap().len(), 4999);
        assert_eq!(graph.ancestors(&last).unwrap().len(), 4999);
    }

    #[test]
    fn test_unknown_id() {
        let graph = Graph::in_memory();
        assert!(matches!(graph.ancestors("nope"), Err(GraphError::NotFound(_))));
        assert!(matches!(graph.descendants("nope"), Err(GraphError::NotFound(_))));
    }

    #[test]
    fn test_summarize_subtree_is_stored_and_bounded() {
        let mut graph = Graph::in_memory();
        let root = graph.create_root("Q1").unwrap();
        graph.edit_response(&root, "A1").unwrap();
        let child = graph.create_reply(&root, "Q2").unwrap();
        graph.edit_response(&child, &"x".repeat(3000)).unwrap();

        let summary = graph.summarize_subtree(&root).unwrap();
        assert!(summary.starts_with("Q1 -> A1\nQ2 -> x"));
        assert_eq!(summary.chars().count(), SUBTREE_SUMMARY_CHARS);
        assert_eq!(graph.get(&root).unwrap().subtree_summary.as_deref(), Some(summary.as_str()));
        // deterministic
        assert_eq!(graph.summarize_subtree(&root).unwrap(), summary);
    }

    #[test]
    fn test_render_tree_indents_by_depth() {
        let mut graph = Graph::in_memory();
        let root = graph.create_root("Root").unwrap();
        let child = graph.create_reply(&root, "Child").unwrap();
        let tree = graph.render_tree(&root).unwrap();
        assert_eq!(tree, format!("[{}] Root\n  [{}] Child\n", root, child));
    }
}
