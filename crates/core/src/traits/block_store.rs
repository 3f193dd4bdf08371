//! Content-addressed block payload storage.
//!
//! The DAG keeps metadata only; full block payloads live in a separate
//! content-addressed store that outer layers write to after a successful
//! metadata insert. The core consumes the two methods below and nothing else.

use arbor_types::BlockHash;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from the block payload store.
#[derive(Debug, Error)]
pub enum BlockStoreError {
    /// A backend I/O failure.
    #[error("block store I/O error: {0}")]
    Io(String),

    /// The store was closed.
    #[error("block store is closed")]
    Closed,
}

/// Result type for block store operations.
pub type BlockStoreResult<T> = Result<T, BlockStoreError>;

/// Content-addressed storage of serialized block payloads.
///
/// # Thread Safety
///
/// All implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store a block payload under its hash.
    async fn put(&self, hash: BlockHash, bytes: Vec<u8>) -> BlockStoreResult<()>;

    /// Fetch a block payload by hash. Returns `Ok(None)` when absent.
    async fn get(&self, hash: &BlockHash) -> BlockStoreResult<Option<Vec<u8>>>;

    /// Check whether a payload is present.
    async fn contains(&self, hash: &BlockHash) -> BlockStoreResult<bool> {
        Ok(self.get(hash).await?.is_some())
    }
}

/// An in-memory block store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemBlockStore {
    blocks: RwLock<HashMap<BlockHash, Vec<u8>>>,
}

impl InMemBlockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// True when no payloads are stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

#[async_trait]
impl BlockStore for InMemBlockStore {
    async fn put(&self, hash: BlockHash, bytes: Vec<u8>) -> BlockStoreResult<()> {
        self.blocks.write().insert(hash, bytes);
        Ok(())
    }

    async fn get(&self, hash: &BlockHash) -> BlockStoreResult<Option<Vec<u8>>> {
        Ok(self.blocks.read().get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = InMemBlockStore::new();
        let hash = BlockHash::new([1; 32]);

        store.put(hash, b"payload".to_vec()).await.unwrap();
        assert_eq!(store.get(&hash).await.unwrap(), Some(b"payload".to_vec()));
        assert!(store.contains(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_is_none() {
        let store = InMemBlockStore::new();
        let hash = BlockHash::new([2; 32]);
        assert_eq!(store.get(&hash).await.unwrap(), None);
        assert!(!store.contains(&hash).await.unwrap());
    }
}
