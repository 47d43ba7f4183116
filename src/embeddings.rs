//! Node embeddings and semantic search.
//!
//! Embeddings are stored on the nodes themselves. The search index is
//! rebuilt from the graph on every query, which is fine for graphs of a few
//! thousand nodes and keeps the results exact.

use crate::conversation::Conversation;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::similarity::FlatIndex;

/// Index every embedded node, in insertion order.
///
/// Nodes whose vector disagrees with the first embedded node's dimension
/// are left out with a warning.
pub fn build_index(graph: &Graph) -> FlatIndex {
    let mut index = FlatIndex::new();
    for node in graph.nodes() {
        if let Some(ref embedding) = node.embedding {
            if let Err(e) = index.add(&node.id, embedding) {
                tracing::warn!(id = %node.id, error = %e, "skipping embedding");
            }
        }
    }
    index
}

impl Conversation {
    /// Embed `prompt + response` and store the vector on the node.
    /// With `dry_run` the node is looked up but nothing is computed or stored.
    pub fn embed_node(&mut self, id: &str, dry_run: bool) -> Result<()> {
        let text = self.graph.node(id)?.embedding_text();
        if dry_run {
            tracing::info!(id, "[dry run] would embed node");
            return Ok(());
        }

        let vector = self.embed_text(id, &text)?;
        self.check_dimension(id, vector.len())?;
        self.graph.set_embedding(id, vector)?;
        tracing::debug!(id, "embedded node");
        Ok(())
    }

    /// Re-embed every node. All vectors are computed before any is stored,
    /// so switching providers replaces the old dimension in one go.
    pub fn embed_all(&mut self, dry_run: bool) -> Result<usize> {
        let ids: Vec<String> = self.graph.ids().map(str::to_string).collect();
        if dry_run {
            tracing::info!(count = ids.len(), "[dry run] would embed all nodes");
            return Ok(ids.len());
        }

        let mut vectors: Vec<(String, Vec<f32>)> = Vec::with_capacity(ids.len());
        for id in &ids {
            let text = self.graph.node(id)?.embedding_text();
            let vector = self.embed_text(id, &text)?;
            if let Some((_, first)) = vectors.first() {
                if first.len() != vector.len() {
                    return Err(GraphError::InvalidInput(format!(
                        "provider returned dimension {} for {}, expected {}",
                        vector.len(),
                        id,
                        first.len()
                    )));
                }
            }
            vectors.push((id.clone(), vector));
        }

        for (id, vector) in vectors {
            self.graph.node_mut(&id)?.embedding = Some(vector);
        }
        self.graph.persist()?;
        tracing::info!(count = ids.len(), "embedded all nodes");
        Ok(ids.len())
    }

    /// Embed a node and all of its reply descendants.
    pub fn embed_subtree(&mut self, id: &str, dry_run: bool) -> Result<usize> {
        let ids = self.graph.subtree(id)?;
        for node_id in &ids {
            self.embed_node(node_id, dry_run)?;
        }
        Ok(ids.len())
    }

    /// The `k` nodes closest to `query` as (id, -squared_l2), best first.
    /// Nodes without an embedding are ignored; none at all gives an empty list.
    pub fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let index = build_index(&self.graph);
        if index.is_empty() {
            tracing::debug!("no embedded nodes, similarity search is empty");
            return Ok(Vec::new());
        }
        let query_vector = self.embed_text("query", query)?;
        index.search(&query_vector, k)
    }

    /// Embed through the provider, holding it to the dimension it advertises.
    fn embed_text(&self, label: &str, text: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(text)?;
        match self.embedder.dimension() {
            Some(expected) if expected != vector.len() => Err(GraphError::InvalidInput(format!(
                "{} returned dimension {} for {}, expected {}",
                self.embedder.name(),
                vector.len(),
                label,
                expected
            ))),
            _ => Ok(vector),
        }
    }

    /// Every stored embedding shares one dimension.
    fn check_dimension(&self, id: &str, dim: usize) -> Result<()> {
        let existing = self
            .graph
            .nodes()
            .filter(|n| n.id != id)
            .find_map(|n| n.embedding.as_ref().map(Vec::len));
        match existing {
            Some(expected) if expected != dim => Err(GraphError::InvalidInput(format!(
                "embedding for {} has dimension {}, graph uses {} (run embed-all after switching providers)",
                id, dim, expected
            ))),
            _ => Ok(()),
        }
    }
}
