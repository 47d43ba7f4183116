//! Mermaid diagrams of the graph.

use std::collections::HashSet;

use crate::db::Node;
use crate::graph::Graph;
use crate::utils::truncate_chars;

const LABEL_CHARS: usize = 50;

/// Mermaid-safe node label: double quotes become single, newlines spaces.
fn label(node: &Node) -> String {
    let flat = node.prompt.replace('"', "'").replace('\n', " ");
    truncate_chars(&flat, LABEL_CHARS).to_string()
}

fn declare(lines: &mut Vec<String>, node: &Node) {
    lines.push(format!("{}[\"{}\"]", node.id, label(node)));
}

impl Graph {
    /// `graph TD` with reply edges (`-->`) and citation edges (`-.->`).
    pub fn export_mermaid(&self) -> String {
        let mut lines = vec!["graph TD".to_string()];
        for node in self.nodes() {
            declare(&mut lines, node);
        }
        for node in self.nodes() {
            for child in &node.children {
                lines.push(format!("{} --> {}", node.id, child));
            }
            for cited in &node.citations {
                lines.push(format!("{} -.-> {}", node.id, cited));
            }
        }
        lines.join("\n")
    }

    /// Only nodes that cite or are cited, with their citation edges.
    pub fn export_citation_graph(&self) -> String {
        let mut involved: HashSet<&str> = HashSet::new();
        for node in self.nodes() {
            if !node.citations.is_empty() {
                involved.insert(&node.id);
                involved.extend(node.citations.iter().map(String::as_str));
            }
        }

        let mut lines = vec!["graph TD".to_string()];
        for node in self.nodes().filter(|n| involved.contains(n.id.as_str())) {
            declare(&mut lines, node);
        }
        for node in self.nodes() {
            for cited in &node.citations {
                lines.push(format!("{} -.-> {}", node.id, cited));
            }
        }
        lines.join("\n")
    }
}
