//! The in-memory DAG index.
//!
//! Purely derived from the metadata records: the child map and the
//! justification-back map invert the edges stored in each block, and the
//! topological vector buckets block hashes by rank, preserving insertion
//! order within a rank. Rebuilt from scratch by replaying the metadata log
//! on startup; never persisted itself.
//!
//! Parent/child and justification relations are kept as two independent maps
//! keyed by hash. Metadata values never hold back-pointers.

use arbor_types::{BlockHash, BlockMetadata, Rank};
use std::collections::{HashMap, HashSet};

/// Inverse edge maps plus the rank-bucketed topological vector.
#[derive(Debug, Default, Clone)]
pub struct DagIndex {
    children: HashMap<BlockHash, HashSet<BlockHash>>,
    justified_by: HashMap<BlockHash, HashSet<BlockHash>>,
    topo_sort: Vec<Vec<BlockHash>>,
}

impl DagIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one block. The metadata's rank must already be assigned.
    ///
    /// Inserting the same hash twice is a no-op at the topological level;
    /// edge sets deduplicate naturally.
    pub fn insert(&mut self, meta: &BlockMetadata) {
        for parent in &meta.parents {
            self.children.entry(*parent).or_default().insert(meta.hash);
        }
        for justification in &meta.justifications {
            self.justified_by
                .entry(justification.latest_hash)
                .or_default()
                .insert(meta.hash);
        }

        let rank = meta.rank as usize;
        if self.topo_sort.len() <= rank {
            self.topo_sort.resize_with(rank + 1, Vec::new);
        }
        let bucket = &mut self.topo_sort[rank];
        if !bucket.contains(&meta.hash) {
            bucket.push(meta.hash);
        }
    }

    /// Children of `hash`, if any are indexed.
    pub fn children(&self, hash: &BlockHash) -> Option<&HashSet<BlockHash>> {
        self.children.get(hash)
    }

    /// Blocks that cite `hash` in a justification, if any are indexed.
    pub fn justified_by(&self, hash: &BlockHash) -> Option<&HashSet<BlockHash>> {
        self.justified_by.get(hash)
    }

    /// Rank buckets from `start` to the top of the DAG.
    pub fn topo_sort(&self, start: Rank) -> Vec<Vec<BlockHash>> {
        let start = (start as usize).min(self.topo_sort.len());
        self.topo_sort[start..].to_vec()
    }

    /// Rank buckets from `start` to `end`, inclusive at both ends.
    pub fn topo_sort_range(&self, start: Rank, end: Rank) -> Vec<Vec<BlockHash>> {
        if end < start {
            return Vec::new();
        }
        let len = self.topo_sort.len();
        let start = (start as usize).min(len);
        // Inclusive end, saturating at the top rank.
        let end = (end as usize).saturating_add(1).min(len);
        self.topo_sort[start..end].to_vec()
    }

    /// The last `k` rank buckets.
    pub fn topo_sort_tail(&self, k: u64) -> Vec<Vec<BlockHash>> {
        let len = self.topo_sort.len();
        let start = len.saturating_sub(k as usize);
        self.topo_sort[start..].to_vec()
    }

    /// Number of rank buckets (max rank + 1, or 0 when empty).
    pub fn rank_count(&self) -> u64 {
        self.topo_sort.len() as u64
    }

    /// A total order over all blocks of rank `start` and above, keyed by
    /// `(rank, insertion index within rank)`.
    pub fn derive_ordering(&self, start: Rank) -> BlockOrdering {
        let mut position = HashMap::new();
        let mut next = 0u64;
        for bucket in self.topo_sort.iter().skip(start as usize) {
            for hash in bucket {
                position.insert(*hash, next);
                next += 1;
            }
        }
        BlockOrdering { position }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.children.clear();
        self.justified_by.clear();
        self.topo_sort.clear();
    }
}

/// A total order over the block hashes of some rank suffix of the DAG.
///
/// Hashes below the ordering's start rank (or unknown to the DAG) have no
/// position; comparing them yields `None` rather than an arbitrary answer.
#[derive(Debug, Clone)]
pub struct BlockOrdering {
    position: HashMap<BlockHash, u64>,
}

impl BlockOrdering {
    /// The ordinal of `hash` under this order.
    pub fn position(&self, hash: &BlockHash) -> Option<u64> {
        self.position.get(hash).copied()
    }

    /// Compare two hashes under this order. `None` if either is not ordered.
    pub fn compare(&self, a: &BlockHash, b: &BlockHash) -> Option<std::cmp::Ordering> {
        Some(self.position(a)?.cmp(&self.position(b)?))
    }

    /// Number of ordered hashes.
    pub fn len(&self) -> usize {
        self.position.len()
    }

    /// True when no hashes are ordered.
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }
}
