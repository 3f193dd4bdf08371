//! Shared in-memory DAG state.
//!
//! Both store variants (persistent and in-memory) keep the same three
//! structures: the metadata map, the latest-messages map and the
//! [`DagIndex`]. This module owns the insert semantics - rank assignment and
//! the latest-message update rules - so the two variants cannot drift.

use crate::index::DagIndex;
use crate::representation::DagRepresentation;
use arbor_types::{BlockHash, BlockMetadata, Rank, ValidatorId};
use std::collections::HashMap;
use std::sync::Arc;

/// The mutable core shared by both store variants.
#[derive(Debug, Default)]
pub(crate) struct DagState {
    pub metadata: HashMap<BlockHash, Arc<BlockMetadata>>,
    pub latest: HashMap<ValidatorId, BlockHash>,
    pub index: DagIndex,
}

impl DagState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rank the store assigns to a block with these parents: 0 with no
    /// parents, else 1 + the highest known parent rank. Parents outside the
    /// DAG (allowed only for the bootstrap block) contribute nothing.
    pub fn assign_rank(&self, parents: &[BlockHash]) -> Rank {
        parents
            .iter()
            .filter_map(|parent| self.metadata.get(parent))
            .map(|meta| meta.rank + 1)
            .max()
            .unwrap_or(0)
    }

    /// The latest-message updates a block triggers, per the monotone rules:
    /// the author's entry is always overwritten; a validator bonded by this
    /// block inherits it as their latest message only if they have no entry
    /// yet and no justification of the block already names them.
    pub fn latest_updates(&self, meta: &BlockMetadata) -> Vec<(ValidatorId, BlockHash)> {
        let mut updates = Vec::new();
        if !meta.validator.is_empty() {
            updates.push((meta.validator.clone(), meta.hash));
        }
        for bonded in &meta.bonded_validators {
            if bonded == &meta.validator || self.latest.contains_key(bonded) {
                continue;
            }
            let named_in_justification = meta
                .justifications
                .iter()
                .any(|justification| &justification.validator == bonded);
            if !named_in_justification {
                updates.push((bonded.clone(), meta.hash));
            }
        }
        updates
    }

    /// Whether the block is already stored.
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.metadata.contains_key(hash)
    }

    /// Apply a block and its latest-message updates to all three stores.
    pub fn apply(&mut self, meta: Arc<BlockMetadata>, updates: &[(ValidatorId, BlockHash)]) {
        self.index.insert(&meta);
        self.metadata.insert(meta.hash, meta);
        for (validator, hash) in updates {
            self.latest.insert(validator.clone(), *hash);
        }
    }

    /// Replay one persisted metadata record. Idempotent per hash, so records
    /// duplicated by interrupted inserts fold away. Latest messages are
    /// restored separately from their own log by [`restore_latest`].
    ///
    /// [`restore_latest`]: DagState::restore_latest
    pub fn replay(&mut self, meta: BlockMetadata) {
        if self.contains(&meta.hash) {
            return;
        }
        let meta = Arc::new(meta);
        self.index.insert(&meta);
        self.metadata.insert(meta.hash, meta);
    }

    /// Restore latest-message entries in log order (later entries win).
    pub fn restore_latest(&mut self, entries: Vec<(ValidatorId, BlockHash)>) {
        for (validator, hash) in entries {
            self.latest.insert(validator, hash);
        }
    }

    /// Capture a consistent snapshot. Metadata values are shared by `Arc`;
    /// the edge maps and topological vector are copied.
    pub fn snapshot(&self) -> DagRepresentation {
        DagRepresentation::new(
            self.metadata.clone(),
            self.latest.clone(),
            self.index.clone(),
        )
    }

    /// Empty every store.
    pub fn clear(&mut self) {
        self.metadata.clear();
        self.latest.clear();
        self.index.clear();
    }
}
