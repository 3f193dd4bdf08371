//! The shared "last approved block" slot.
//!
//! A single-assignment, concurrency-safe cell. The ceremony writes it once
//! on transition to `Approved`; a second write is rejected rather than
//! silently replacing the genesis. Readers either observe "not yet set" or
//! the final value.

use crate::error::GenesisError;
use arbor_types::ApprovedBlock;
use parking_lot::RwLock;

/// Single-assignment holder of the ceremony's output.
#[derive(Debug, Default)]
pub struct LastApprovedBlock {
    cell: RwLock<Option<ApprovedBlock>>,
}

impl LastApprovedBlock {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the approved block. Fails if the slot was already assigned.
    pub fn set(&self, block: ApprovedBlock) -> Result<(), GenesisError> {
        let mut cell = self.cell.write();
        if cell.is_some() {
            return Err(GenesisError::AlreadyApproved);
        }
        *cell = Some(block);
        Ok(())
    }

    /// The approved block, if the ceremony has finished.
    pub fn get(&self) -> Option<ApprovedBlock> {
        self.cell.read().clone()
    }

    /// The approved block, or [`GenesisError::GenesisUnavailable`] while the
    /// ceremony is still running. Callers retry.
    pub fn require(&self) -> Result<ApprovedBlock, GenesisError> {
        self.get().ok_or(GenesisError::GenesisUnavailable)
    }

    /// Whether the slot has been assigned.
    pub fn is_set(&self) -> bool {
        self.cell.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::{ApprovedBlockCandidate, BlockHash, BlockMetadata, ValidatorId};
    use std::collections::BTreeSet;

    fn approved() -> ApprovedBlock {
        let block = BlockMetadata::new(
            BlockHash::new([1; 32]),
            vec![],
            vec![],
            ValidatorId::empty(),
            0,
            BTreeSet::new(),
        );
        ApprovedBlock::new(ApprovedBlockCandidate::new(block, 0), vec![])
    }

    #[test]
    fn test_starts_unset() {
        let slot = LastApprovedBlock::new();
        assert!(!slot.is_set());
        assert_eq!(slot.get(), None);
        assert_eq!(slot.require(), Err(GenesisError::GenesisUnavailable));
    }

    #[test]
    fn test_single_assignment() {
        let slot = LastApprovedBlock::new();
        slot.set(approved()).unwrap();
        assert!(slot.is_set());
        assert_eq!(slot.require().unwrap(), approved());

        assert_eq!(slot.set(approved()), Err(GenesisError::AlreadyApproved));
    }
}
