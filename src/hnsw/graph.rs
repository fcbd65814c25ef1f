//! HNSW graph — core data structures and algorithms.
//!
//! Implements the Hierarchical Navigable Small World graph from:
//! "Efficient and robust approximate nearest neighbor search using
//!  Hierarchical Navigable Small World graphs" (Malkov & Yashunin, 2016/2018),
//! reworked for similarity scores where higher means closer.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::DistanceMetric;
use crate::error::{Result, StoreError};
use crate::vector::Vector;

use super::neighbor_queue::{BestFirstQueue, Neighbor, WorstFirstQueue};

/// Configuration parameters for the HNSW graph.
#[derive(Debug, Clone)]
pub struct HnswParams {
    /// Max number of connections per node (layers > 0).
    pub m: usize,
    /// Max connections at layer 0 (typically 2 * m).
    pub m_max0: usize,
    /// Number of candidates during construction.
    pub ef_construction: usize,
    /// Number of candidates during search.
    pub ef_search: usize,
    /// Level generation factor: 1 / ln(m).
    pub ml: f64,
    /// Maximum number of layers.
    pub max_layers: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        let m = 16;
        Self {
            m,
            m_max0: 2 * m,
            ef_construction: 200,
            ef_search: 50,
            ml: 1.0 / (m as f64).ln(),
            max_layers: 16,
        }
    }
}

impl HnswParams {
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            m,
            m_max0: 2 * m,
            ef_construction,
            ef_search,
            ml: 1.0 / (m as f64).ln(),
            max_layers: 16,
        }
    }
}

/// A node in the HNSW graph.
#[derive(Debug, Clone)]
struct HnswNode {
    vector: Vector,
    /// Neighbors per layer. neighbors[l] is the list of neighbor slots at layer l.
    neighbors: Vec<Vec<usize>>,
    /// The maximum layer this node was inserted into.
    level: usize,
}

/// The HNSW graph structure, addressed by dense slot numbers.
#[derive(Debug)]
pub struct HnswGraph {
    /// Nodes indexed by slot. Slots can be None after deletion.
    nodes: Vec<Option<HnswNode>>,
    /// Entry point slot (highest-level node).
    entry_point: Option<usize>,
    /// Current maximum level in the graph.
    max_level: usize,
    params: HnswParams,
    metric: DistanceMetric,
    /// RNG for level generation.
    rng: StdRng,
    /// Count of active (non-deleted) nodes.
    count: usize,
}

impl HnswGraph {
    pub fn new(metric: DistanceMetric, params: HnswParams) -> Self {
        Self {
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            params,
            metric,
            rng: StdRng::from_entropy(),
            count: 0,
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Generate a random level for a new node.
    fn random_level(&mut self) -> usize {
        let r: f64 = self.rng.gen();
        let level = (-r.ln() * self.params.ml).floor() as usize;
        level.min(self.params.max_layers.saturating_sub(1))
    }

    /// Score a query against the node in the given slot.
    fn score(&self, query: &Vector, slot: usize) -> Result<f32> {
        let node = self.nodes[slot]
            .as_ref()
            .ok_or_else(|| StoreError::backend(format!("missing graph node in slot {slot}")))?;
        self.metric.score(query, &node.vector)
    }

    /// Construction and search parameters this graph was built with.
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    /// Get the vector stored in a slot.
    pub fn vector(&self, slot: usize) -> Option<&Vector> {
        self.nodes.get(slot).and_then(|n| n.as_ref()).map(|n| &n.vector)
    }

    /// Iterate over all occupied (slot, vector) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Vector)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, n)| n.as_ref().map(|n| (slot, &n.vector)))
    }

    /// SEARCH-LAYER: Algorithm 2 from the HNSW paper, score-ordered.
    ///
    /// Search a single layer for the ef best-scoring neighbors of query,
    /// starting from the entry slots `ep`.
    fn search_layer(
        &self,
        query: &Vector,
        ep: &[usize],
        ef: usize,
        layer: usize,
    ) -> Result<Vec<Neighbor>> {
        let mut visited = HashSet::new();
        let mut candidates = BestFirstQueue::new();
        let mut results = WorstFirstQueue::new();

        for &ep_slot in ep {
            let score = self.score(query, ep_slot)?;
            visited.insert(ep_slot);
            candidates.push(Neighbor::new(ep_slot, score));
            results.push(Neighbor::new(ep_slot, score));
        }

        while let Some(c) = candidates.pop() {
            // If the best candidate scores worse than the worst result, stop
            let worst = results.worst_score().unwrap_or(f32::NEG_INFINITY);
            if c.score < worst {
                break;
            }

            // Explore neighbors of c at this layer
            if let Some(node) = &self.nodes[c.slot] {
                if layer < node.neighbors.len() {
                    for &neighbor_slot in &node.neighbors[layer] {
                        if visited.contains(&neighbor_slot) {
                            continue;
                        }
                        visited.insert(neighbor_slot);

                        // Skip deleted nodes
                        if self.nodes.get(neighbor_slot).and_then(|n| n.as_ref()).is_none() {
                            continue;
                        }

                        let score = self.score(query, neighbor_slot)?;
                        let worst = results.worst_score().unwrap_or(f32::NEG_INFINITY);

                        if score > worst || results.len() < ef {
                            candidates.push(Neighbor::new(neighbor_slot, score));
                            results.push(Neighbor::new(neighbor_slot, score));
                            if results.len() > ef {
                                results.pop(); // evict worst
                            }
                        }
                    }
                }
            }
        }

        Ok(results.into_sorted_vec())
    }

    /// Select the M best neighbors from candidates (simple selection, Algorithm 3).
    fn select_neighbors_simple(candidates: &[Neighbor], m: usize) -> Vec<usize> {
        candidates.iter().take(m).map(|n| n.slot).collect()
    }

    /// Prune a node's neighbor list at a given layer to the best `m` entries.
    fn prune_neighbors(&mut self, slot: usize, layer: usize, m: usize) {
        let (neighbor_slots, node_vec) = {
            let node = match &self.nodes[slot] {
                Some(n) => n,
                None => return,
            };
            if layer >= node.neighbors.len() {
                return;
            }
            (node.neighbors[layer].clone(), node.vector.clone())
        };

        let mut scored: Vec<(usize, f32)> = neighbor_slots
            .into_iter()
            .filter_map(|ns| {
                self.nodes.get(ns).and_then(|n| n.as_ref()).map(|n| {
                    let score = self
                        .metric
                        .score(&node_vec, &n.vector)
                        .unwrap_or(f32::NEG_INFINITY);
                    (ns, score)
                })
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(m);

        if let Some(node) = &mut self.nodes[slot] {
            if layer < node.neighbors.len() {
                node.neighbors[layer] = scored.into_iter().map(|(ns, _)| ns).collect();
            }
        }
    }

    /// INSERT: Algorithm 1 from the HNSW paper.
    pub fn insert(&mut self, slot: usize, vector: Vector) -> Result<()> {
        let level = self.random_level();

        if slot >= self.nodes.len() {
            self.nodes.resize_with(slot + 1, || None);
        }

        let node = HnswNode {
            vector: vector.clone(),
            neighbors: vec![Vec::new(); level + 1],
            level,
        };
        self.nodes[slot] = Some(node);
        self.count += 1;

        // First node becomes the entry point
        let entry_point = match self.entry_point {
            None => {
                self.entry_point = Some(slot);
                self.max_level = level;
                return Ok(());
            }
            Some(ep) => ep,
        };

        let mut ep_slot = entry_point;
        let current_max_level = self.max_level;

        // Phase 1: Greedy descent from top layer down to level+1 (ef=1)
        if current_max_level > level {
            for l in (level + 1..=current_max_level).rev() {
                let nearest = self.search_layer(&vector, &[ep_slot], 1, l)?;
                if let Some(n) = nearest.first() {
                    ep_slot = n.slot;
                }
            }
        }

        // Phase 2: Insert at layers min(level, current_max_level) down to 0
        let insert_from = level.min(current_max_level);
        for l in (0..=insert_from).rev() {
            let m = if l == 0 {
                self.params.m_max0
            } else {
                self.params.m
            };

            let nearest =
                self.search_layer(&vector, &[ep_slot], self.params.ef_construction, l)?;

            let neighbors = Self::select_neighbors_simple(&nearest, m);

            if let Some(node) = &mut self.nodes[slot] {
                if l < node.neighbors.len() {
                    node.neighbors[l] = neighbors.clone();
                }
            }

            // Add bidirectional connections
            for &neighbor_slot in &neighbors {
                let needs_pruning = if let Some(neighbor_node) = &mut self.nodes[neighbor_slot] {
                    if l < neighbor_node.neighbors.len() {
                        neighbor_node.neighbors[l].push(slot);
                        neighbor_node.neighbors[l].len() > m
                    } else {
                        false
                    }
                } else {
                    false
                };

                // Prune in a separate step to avoid borrow conflicts
                if needs_pruning {
                    self.prune_neighbors(neighbor_slot, l, m);
                }
            }

            if let Some(n) = nearest.first() {
                ep_slot = n.slot;
            }
        }

        // Update entry point if new node has a higher level
        if level > self.max_level {
            self.entry_point = Some(slot);
            self.max_level = level;
        }

        Ok(())
    }

    /// Remove a node from the graph (lazy deletion — unlinks from neighbor lists).
    pub fn remove(&mut self, slot: usize) -> Result<()> {
        if slot >= self.nodes.len() || self.nodes[slot].is_none() {
            return Ok(());
        }

        if let Some(node) = self.nodes[slot].take() {
            for (layer, neighbors) in node.neighbors.iter().enumerate() {
                for &neighbor_slot in neighbors {
                    if let Some(Some(neighbor_node)) = self.nodes.get_mut(neighbor_slot) {
                        if layer < neighbor_node.neighbors.len() {
                            neighbor_node.neighbors[layer].retain(|&n| n != slot);
                        }
                    }
                }
            }
            self.count -= 1;

            // Repair the entry point if we removed it
            if self.entry_point == Some(slot) {
                self.entry_point = self
                    .nodes
                    .iter()
                    .enumerate()
                    .filter_map(|(i, n)| n.as_ref().map(|n| (i, n.level)))
                    .max_by_key(|&(_, level)| level)
                    .map(|(i, _)| i);

                self.max_level = self
                    .entry_point
                    .and_then(|ep| self.nodes[ep].as_ref().map(|n| n.level))
                    .unwrap_or(0);
            }
        }

        Ok(())
    }

    /// SEARCH: Algorithm 5 from the HNSW paper.
    ///
    /// Search for the k best-scoring neighbors, using ef candidates.
    pub fn search_knn(&self, query: &Vector, k: usize, ef: usize) -> Result<Vec<Neighbor>> {
        let entry_point = match self.entry_point {
            Some(ep) => ep,
            None => return Ok(vec![]),
        };

        let mut ep_slot = entry_point;

        // Phase 1: Greedy descent from top layer to layer 1 (ef=1)
        for l in (1..=self.max_level).rev() {
            let nearest = self.search_layer(query, &[ep_slot], 1, l)?;
            if let Some(n) = nearest.first() {
                ep_slot = n.slot;
            }
        }

        // Phase 2: Search layer 0 with max(ef, k) candidates
        let ef_actual = ef.max(k);
        let mut results = self.search_layer(query, &[ep_slot], ef_actual, 0)?;

        results.truncate(k);
        Ok(results)
    }
}
