//! Immutable DAG snapshots.
//!
//! A [`DagRepresentation`] is the read surface of the store: a consistent
//! capture of the metadata map, both inverse edge maps, the latest-messages
//! map and the topological vector. Snapshots are taken under the writer
//! permit, share block metadata with the live store through `Arc`, and stay
//! valid (and unchanged) across any number of later writes.

use crate::index::{BlockOrdering, DagIndex};
use arbor_types::{BlockHash, BlockMetadata, Rank, ValidatorId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A read-only, internally consistent view of the DAG.
#[derive(Debug, Clone, Default)]
pub struct DagRepresentation {
    metadata: HashMap<BlockHash, Arc<BlockMetadata>>,
    latest: HashMap<ValidatorId, BlockHash>,
    index: DagIndex,
}

impl DagRepresentation {
    pub(crate) fn new(
        metadata: HashMap<BlockHash, Arc<BlockMetadata>>,
        latest: HashMap<ValidatorId, BlockHash>,
        index: DagIndex,
    ) -> Self {
        Self {
            metadata,
            latest,
            index,
        }
    }

    /// Whether `hash` is in the DAG.
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.metadata.contains_key(hash)
    }

    /// The metadata stored for `hash`.
    pub fn lookup(&self, hash: &BlockHash) -> Option<Arc<BlockMetadata>> {
        self.metadata.get(hash).cloned()
    }

    /// The children of `hash`: `None` for unknown blocks, possibly empty for
    /// tips.
    pub fn children(&self, hash: &BlockHash) -> Option<HashSet<BlockHash>> {
        if !self.contains(hash) {
            return None;
        }
        Some(self.index.children(hash).cloned().unwrap_or_default())
    }

    /// Blocks whose justifications cite `hash`: `None` for unknown blocks.
    pub fn justification_to_blocks(&self, hash: &BlockHash) -> Option<HashSet<BlockHash>> {
        if !self.contains(hash) {
            return None;
        }
        Some(self.index.justified_by(hash).cloned().unwrap_or_default())
    }

    /// Latest message hash for `validator`.
    pub fn latest_message_hash(&self, validator: &ValidatorId) -> Option<BlockHash> {
        self.latest.get(validator).copied()
    }

    /// Latest message metadata for `validator`.
    pub fn latest_message(&self, validator: &ValidatorId) -> Option<Arc<BlockMetadata>> {
        self.latest_message_hash(validator)
            .and_then(|hash| self.lookup(&hash))
    }

    /// The full latest-messages map.
    pub fn latest_message_hashes(&self) -> &HashMap<ValidatorId, BlockHash> {
        &self.latest
    }

    /// The latest-messages map resolved to metadata.
    pub fn latest_messages(&self) -> HashMap<ValidatorId, Arc<BlockMetadata>> {
        self.latest
            .iter()
            .filter_map(|(validator, hash)| {
                self.lookup(hash).map(|meta| (validator.clone(), meta))
            })
            .collect()
    }

    /// The metadata map.
    pub fn metadata(&self) -> &HashMap<BlockHash, Arc<BlockMetadata>> {
        &self.metadata
    }

    /// Number of blocks in the DAG.
    pub fn block_count(&self) -> usize {
        self.metadata.len()
    }

    /// Rank buckets from `start` upward.
    pub fn topo_sort(&self, start: Rank) -> Vec<Vec<BlockHash>> {
        self.index.topo_sort(start)
    }

    /// Rank buckets from `start` to `end`, inclusive at both ends.
    pub fn topo_sort_range(&self, start: Rank, end: Rank) -> Vec<Vec<BlockHash>> {
        self.index.topo_sort_range(start, end)
    }

    /// The last `k` rank buckets.
    pub fn topo_sort_tail(&self, k: u64) -> Vec<Vec<BlockHash>> {
        self.index.topo_sort_tail(k)
    }

    /// Number of rank buckets.
    pub fn rank_count(&self) -> u64 {
        self.index.rank_count()
    }

    /// A total order over blocks of rank `start` and above.
    pub fn derive_ordering(&self, start: Rank) -> BlockOrdering {
        self.index.derive_ordering(start)
    }
}
