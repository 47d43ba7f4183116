//! Exact nearest-neighbour search over node embeddings
//!
//! Squared Euclidean (L2) distance, brute force. Results are reported as
//! `-distance` so a higher score means more similar.

use std::cmp::Ordering;

use crate::error::{GraphError, Result};

/// Squared L2 distance. Callers guarantee equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Flat (exhaustive) index, the moral equivalent of an `IndexFlatL2`.
/// Insertion order is the tie-breaker for equal distances.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dim: Option<usize>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add one vector. The first vector fixes the dimension.
    pub fn add(&mut self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(GraphError::InvalidInput(format!("empty embedding for {}", id)));
        }
        match self.dim {
            Some(dim) if dim != vector.len() => {
                return Err(GraphError::InvalidInput(format!(
                    "embedding for {} has dimension {}, index has {}",
                    id,
                    vector.len(),
                    dim
                )));
            }
            Some(_) => {}
            None => self.dim = Some(vector.len()),
        }
        self.ids.push(id.to_string());
        self.vectors.push(vector.to_vec());
        Ok(())
    }

    /// The `k` closest vectors as (id, -squared_distance), closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        if self.dim != Some(query.len()) {
            return Err(GraphError::InvalidInput(format!(
                "query has dimension {}, index has {}",
                query.len(),
                self.dim.unwrap_or(0)
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();

        // Stable sort keeps insertion order among equal distances
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, dist)| (self.ids[i].clone(), -dist))
            .collect())
    }
}
