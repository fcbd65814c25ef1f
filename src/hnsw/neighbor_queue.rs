//! Priority queue utilities for HNSW — handles f32 score ordering for BinaryHeap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A scored candidate with its graph slot.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub score: f32,
    pub slot: usize,
}

impl Neighbor {
    pub fn new(slot: usize, score: f32) -> Self {
        Self { score, slot }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.slot == other.slot
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Natural ordering: by score ascending. `BinaryHeap<Neighbor>` is
// therefore a best-on-top queue under the higher-is-better convention.
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.slot.cmp(&self.slot))
    }
}

/// Reverses Neighbor ordering so the worst score sits on top.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Worst(Neighbor);

impl PartialOrd for Worst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Worst {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

/// Queue that pops the highest-scoring neighbor first. Used as the
/// candidate frontier during layer search.
pub struct BestFirstQueue {
    heap: BinaryHeap<Neighbor>,
}

impl BestFirstQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, n: Neighbor) {
        self.heap.push(n);
    }

    pub fn pop(&mut self) -> Option<Neighbor> {
        self.heap.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Queue that pops the lowest-scoring neighbor first. Used as the ef-
/// bounded result set: when over capacity, the worst entry is evicted.
pub struct WorstFirstQueue {
    heap: BinaryHeap<Worst>,
}

impl WorstFirstQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, n: Neighbor) {
        self.heap.push(Worst(n));
    }

    /// The current worst score in the set, if any.
    pub fn worst_score(&self) -> Option<f32> {
        self.heap.peek().map(|w| w.0.score)
    }

    pub fn pop(&mut self) -> Option<Neighbor> {
        self.heap.pop().map(|w| w.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drain into a Vec sorted best-first (descending score).
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        let mut v: Vec<Neighbor> = self.heap.into_iter().map(|w| w.0).collect();
        v.sort_by(|a, b| b.cmp(a));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_first_ordering() {
        let mut queue = BestFirstQueue::new();
        queue.push(Neighbor::new(0, 0.3));
        queue.push(Neighbor::new(1, 0.9));
        queue.push(Neighbor::new(2, 0.5));

        assert_eq!(queue.pop().unwrap().score, 0.9);
        assert_eq!(queue.pop().unwrap().score, 0.5);
        assert_eq!(queue.pop().unwrap().score, 0.3);
    }

    #[test]
    fn test_worst_first_ordering() {
        let mut queue = WorstFirstQueue::new();
        queue.push(Neighbor::new(0, 0.3));
        queue.push(Neighbor::new(1, 0.9));
        queue.push(Neighbor::new(2, 0.5));

        assert_eq!(queue.worst_score(), Some(0.3));
        assert_eq!(queue.pop().unwrap().score, 0.3);
        assert_eq!(queue.pop().unwrap().score, 0.5);
        assert_eq!(queue.pop().unwrap().score, 0.9);
    }

    #[test]
    fn test_into_sorted_vec_is_best_first() {
        let mut queue = WorstFirstQueue::new();
        queue.push(Neighbor::new(0, 0.1));
        queue.push(Neighbor::new(1, 0.7));
        queue.push(Neighbor::new(2, 0.4));
        queue.push(Neighbor::new(3, 0.6));

        let sorted = queue.into_sorted_vec();
        for pair in sorted.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(sorted[0].score, 0.7);
    }
}
