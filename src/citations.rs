//! Citation edges between nodes.
//!
//! Citations form a DAG separate from the reply tree: `from -> to` means
//! `from` builds on `to`. Reply edges never count for cycle detection.

use std::collections::HashSet;

use crate::error::{GraphError, Result};
use crate::graph::Graph;

impl Graph {
    /// Add `from -> to`. Returns `false` if the edge was already there.
    ///
    /// Rejected with `Cycle` if `to` can already reach `from` through
    /// existing citations (this includes `from == to`).
    pub fn add_citation(&mut self, from_id: &str, to_id: &str) -> Result<bool> {
        if !self.contains(from_id) {
            return Err(GraphError::node_not_found(from_id));
        }
        if !self.contains(to_id) {
            return Err(GraphError::node_not_found(to_id));
        }
        if self.citation_path_exists(to_id, from_id) {
            return Err(GraphError::Cycle {
                from: from_id.to_string(),
                to: to_id.to_string(),
            });
        }

        let node = self.node_mut(from_id)?;
        if node.citations.iter().any(|c| c == to_id) {
            return Ok(false);
        }
        node.citations.push(to_id.to_string());
        node.touch();

        tracing::debug!(from = from_id, to = to_id, "citation added");
        self.persist()?;
        Ok(true)
    }

    /// Nodes `id` cites, in the order they were added.
    pub fn citations_of(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.node(id)?.citations.clone())
    }

    /// Nodes citing `id`, in insertion order.
    pub fn cited_by(&self, id: &str) -> Result<Vec<String>> {
        if !self.contains(id) {
            return Err(GraphError::node_not_found(id));
        }
        Ok(self
            .nodes()
            .filter(|n| n.citations.iter().any(|c| c == id))
            .map(|n| n.id.clone())
            .collect())
    }

    /// Union of `citations_of` and `cited_by`, without duplicates.
    pub fn related(&self, id: &str) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut related = Vec::new();
        for other in self.citations_of(id)?.into_iter().chain(self.cited_by(id)?) {
            if seen.insert(other.clone()) {
                related.push(other);
            }
        }
        Ok(related)
    }

    /// Whether `start` reaches `target` by following citation edges.
    ///
    /// Iterative DFS with a visited set, so it terminates even if the data
    /// already contains a cycle.
    pub fn citation_path_exists(&self, start: &str, target: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.get(current) {
                for next in &node.citations {
                    if !visited.contains(next.as_str()) {
                        stack.push(next.as_str());
                    }
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_nodes() -> (Graph, String, String, String) {
        let mut graph = Graph::in_memory();
        let a = graph.create_root("a").unwrap();
        let b = graph.create_root("b").unwrap();
        let c = graph.create_root("c").unwrap();
        (graph, a, b, c)
    }

    #[test]
    fn test_two_node_cycle_rejected() {
        let (mut graph, a, b, _) = three_nodes();
        assert!(graph.add_citation(&a, &b).unwrap());
        let err = graph.add_citation(&b, &a).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
        assert!(graph.citations_of(&b).unwrap().is_empty());
    }

    #[test]
    fn test_three_node_cycle_rejected() {
        let (mut graph, a, b, c) = three_nodes();
        graph.add_citation(&a, &b).unwrap();
        graph.add_citation(&c, &a).unwrap();
        assert!(matches!(graph.add_citation(&b, &c), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn test_self_citation_rejected() {
        let (mut graph, a, _, _) = three_nodes();
        assert!(matches!(graph.add_citation(&a, &a), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn test_duplicate_citation_is_idempotent() {
        let (mut graph, a, b, _) = three_nodes();
        assert!(graph.add_citation(&a, &b).unwrap());
        assert!(!graph.add_citation(&a, &b).unwrap());
        assert_eq!(graph.citations_of(&a).unwrap(), vec![b]);
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let (mut graph, a, _, _) = three_nodes();
        assert!(matches!(graph.add_citation(&a, "zzz"), Err(GraphError::NotFound(_))));
        assert!(matches!(graph.add_citation("zzz", &a), Err(GraphError::NotFound(_))));
        assert!(graph.citations_of("zzz").is_err());
        assert!(graph.cited_by("zzz").is_err());
    }

    #[test]
    fn test_reply_edges_do_not_count_as_citations() {
        let mut graph = Graph::in_memory();
        let parent = graph.create_root("parent").unwrap();
        let child = graph.create_reply(&parent, "child").unwrap();
        // Both directions are fine: the tree is a separate graph
        graph.add_citation(&parent, &child).unwrap();
        assert!(graph.citation_path_exists(&parent, &child));
        assert!(!graph.citation_path_exists(&child, &parent));
    }

    #[test]
    fn test_cited_by_and_related() {
        let (mut graph, a, b, c) = three_nodes();
        graph.add_citation(&a, &b).unwrap();
        graph.add_citation(&c, &a).unwrap();
        graph.add_citation(&c, &b).unwrap();

        assert_eq!(graph.cited_by(&b).unwrap(), vec![a.clone(), c.clone()]);
        let related = graph.related(&a).unwrap();
        assert_eq!(related.len(), 2);
        assert!(related.contains(&b) && related.contains(&c));
    }

    #[test]
    fn test_path_search_terminates_on_existing_cycle() {
        let (mut graph, a, b, c) = three_nodes();
        // Simulate a cycle that slipped in through a hand-edited file
        graph.node_mut(&a).unwrap().citations.push(b.clone());
        graph.node_mut(&b).unwrap().citations.push(a.clone());
        assert!(!graph.citation_path_exists(&a, &c));
        assert!(graph.citation_path_exists(&b, &a));
        assert!(!graph.integrity_issues().is_empty());
    }
}
