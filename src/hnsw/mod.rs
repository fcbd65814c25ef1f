//! HNSW (Hierarchical Navigable Small World) index module.

pub mod graph;
pub mod neighbor_queue;

pub use graph::{HnswGraph, HnswParams};

use std::collections::HashMap;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::{rank, VectorIndex};
use crate::record::RecordId;
use crate::vector::Vector;

/// Below this many entries the search falls back to an exhaustive scan,
/// so small datasets always get exact results (in particular the top-1).
pub const EXACT_SCAN_THRESHOLD: usize = 1000;

/// An HNSW-based approximate nearest-neighbor index.
///
/// The graph addresses nodes by dense slots; this wrapper owns the
/// RecordId-to-slot mapping. Replacing an id assigns a fresh slot and
/// lazily deletes the old node.
#[derive(Debug)]
pub struct HnswIndex {
    graph: HnswGraph,
    id_to_slot: HashMap<RecordId, usize>,
    slot_to_id: HashMap<usize, RecordId>,
    next_slot: usize,
}

impl HnswIndex {
    /// Create a new HNSW index with the given metric and default parameters.
    pub fn new(metric: DistanceMetric) -> Self {
        Self::with_params(metric, HnswParams::default())
    }

    /// Create a new HNSW index with custom parameters.
    pub fn with_params(metric: DistanceMetric, params: HnswParams) -> Self {
        Self {
            graph: HnswGraph::new(metric, params),
            id_to_slot: HashMap::new(),
            slot_to_id: HashMap::new(),
            next_slot: 0,
        }
    }

    /// Search with a specific ef value for runtime tuning.
    pub fn search_with_ef(
        &self,
        query: &Vector,
        k: usize,
        ef: usize,
    ) -> Result<Vec<(RecordId, f32)>> {
        if self.graph.len() < EXACT_SCAN_THRESHOLD {
            return self.exact_search(query, k);
        }

        let neighbors = self.graph.search_knn(query, k, ef)?;
        let scored: Vec<(RecordId, f32)> = neighbors
            .into_iter()
            .filter_map(|n| self.slot_to_id.get(&n.slot).map(|&id| (id, n.score)))
            .collect();
        Ok(rank(scored, k))
    }

    /// Exhaustive scoring over the graph's occupied slots.
    fn exact_search(&self, query: &Vector, k: usize) -> Result<Vec<(RecordId, f32)>> {
        let metric = self.graph.metric();
        let scored = self
            .graph
            .iter()
            .filter_map(|(slot, vector)| {
                self.slot_to_id
                    .get(&slot)
                    .map(|&id| metric.score(query, vector).map(|s| (id, s)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(rank(scored, k))
    }
}

impl VectorIndex for HnswIndex {
    fn with_metric(metric: DistanceMetric) -> Self {
        Self::new(metric)
    }

    fn insert(&mut self, id: RecordId, vector: Vector) -> Result<()> {
        if let Some(old_slot) = self.id_to_slot.remove(&id) {
            self.slot_to_id.remove(&old_slot);
            self.graph.remove(old_slot)?;
        }

        let slot = self.next_slot;
        self.next_slot += 1;

        self.graph.insert(slot, vector)?;
        self.id_to_slot.insert(id, slot);
        self.slot_to_id.insert(slot, id);
        Ok(())
    }

    fn remove(&mut self, id: RecordId) -> Result<()> {
        if let Some(slot) = self.id_to_slot.remove(&id) {
            self.slot_to_id.remove(&slot);
            self.graph.remove(slot)?;
        }
        Ok(())
    }

    fn vector(&self, id: RecordId) -> Option<&Vector> {
        self.id_to_slot.get(&id).and_then(|&slot| self.graph.vector(slot))
    }

    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(RecordId, f32)>> {
        self.search_with_ef(query, k, self.graph.params().ef_search)
    }

    fn metric(&self) -> DistanceMetric {
        self.graph.metric()
    }

    fn len(&self) -> usize {
        self.graph.len()
    }
}
