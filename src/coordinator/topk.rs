use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use uuid::Uuid;

/// A scored document with a total order: higher score ranks first, equal
/// scores break ties by ascending doc_id so output is deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: Uuid,
    pub score: f64,
}

impl Eq for ScoredDoc {}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        // Greater means "ranks better": higher score, then lower doc_id.
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded min-heap over candidate documents.
///
/// Push is O(log K): while under capacity candidates are accepted, after that
/// a candidate must beat the current worst to enter. Processing P postings
/// costs O(P log K) regardless of how many candidates the shards return.
pub struct TopK {
    capacity: usize,
    heap: BinaryHeap<Reverse<ScoredDoc>>,
}

impl TopK {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, candidate: ScoredDoc) {
        if self.capacity == 0 {
            return;
        }

        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(candidate));
            return;
        }

        if let Some(Reverse(worst)) = self.heap.peek() {
            if candidate > *worst {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drains the heap into rank order: descending score, ties by ascending
    /// doc_id.
    pub fn into_sorted(self) -> Vec<ScoredDoc> {
        let mut ranked: Vec<ScoredDoc> = self
            .heap
            .into_iter()
            .map(|Reverse(scored)| scored)
            .collect();
        ranked.sort_by(|a, b| b.cmp(a));
        ranked
    }
}
