//! The DAG store façade.
//!
//! [`DagStore`] is the single surface other subsystems see: insert a block,
//! take a snapshot, query it. Two implementations share the semantics in
//! [`DagState`]:
//!
//! - [`PersistentDagStore`] backs the metadata and latest-messages maps with
//!   framed logs and checkpoints on disk,
//! - [`InMemDagStore`] keeps everything in memory (checkpointing is a no-op).
//!
//! ## Concurrency contract
//!
//! One `tokio::sync::Mutex` is the writer permit. Every mutation (`insert`,
//! `clear`, `checkpoint`) runs entirely under it; readers acquire it just
//! long enough to capture a snapshot, so no reader can observe a partial
//! insert. Snapshots share block metadata with the live store via `Arc` and
//! stay valid after any number of later writes.
//!
//! ## Failure contract
//!
//! Disk errors inside `insert` leave the in-memory state untouched: the
//! store applies the insert to memory only after every file operation has
//! succeeded, so the previous snapshot remains the authoritative view and
//! the caller may simply retry.

use crate::config::DagStorageConfig;
use crate::error::{DagStoreError, DagStoreResult};
use crate::latest_store::LatestMessagesLog;
use crate::metadata_store::BlockMetadataLog;
use crate::representation::DagRepresentation;
use crate::state::DagState;
use arbor_types::{BlockHash, BlockMetadata, ValidatorId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Point-in-time counters describing a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct DagStoreStats {
    /// Blocks in the DAG.
    pub block_count: usize,
    /// Rank buckets (max rank + 1).
    pub rank_count: u64,
    /// Validators with a latest-message entry.
    pub latest_entries: usize,
    /// Bytes in the active metadata log (0 for the in-memory store).
    pub metadata_log_bytes: u64,
    /// Records in the latest-messages log (0 for the in-memory store).
    pub latest_log_records: u64,
    /// Checkpoint segments on disk (0 for the in-memory store).
    pub checkpoint_count: usize,
}

/// The block DAG store.
///
/// All operations are serialised through one writer permit; see the module
/// docs for the concurrency and failure contracts.
#[async_trait]
pub trait DagStore: Send + Sync {
    /// Insert a block and return a snapshot containing it.
    ///
    /// The store assigns the block's rank from its parents. Re-inserting a
    /// known hash is a no-op. Fails with
    /// [`DagStoreError::MalformedValidator`] - before any log is touched -
    /// when the validator field is non-empty and not 32 bytes.
    async fn insert(&self, block: BlockMetadata) -> DagStoreResult<Arc<DagRepresentation>>;

    /// Capture a consistent snapshot of the current state.
    async fn get_representation(&self) -> DagStoreResult<Arc<DagRepresentation>>;

    /// Whether `hash` is in the DAG.
    async fn contains(&self, hash: &BlockHash) -> DagStoreResult<bool>;

    /// The metadata stored for `hash`.
    async fn lookup(&self, hash: &BlockHash) -> DagStoreResult<Option<Arc<BlockMetadata>>>;

    /// Children of `hash`; `None` for unknown blocks.
    async fn children(
        &self,
        hash: &BlockHash,
    ) -> DagStoreResult<Option<std::collections::HashSet<BlockHash>>>;

    /// Blocks citing `hash` in a justification; `None` for unknown blocks.
    async fn justification_to_blocks(
        &self,
        hash: &BlockHash,
    ) -> DagStoreResult<Option<std::collections::HashSet<BlockHash>>>;

    /// Latest message hash for `validator`.
    async fn latest_message_hash(
        &self,
        validator: &ValidatorId,
    ) -> DagStoreResult<Option<BlockHash>>;

    /// Latest message metadata for `validator`.
    async fn latest_message(
        &self,
        validator: &ValidatorId,
    ) -> DagStoreResult<Option<Arc<BlockMetadata>>>;

    /// The full latest-messages map.
    async fn latest_message_hashes(&self) -> DagStoreResult<HashMap<ValidatorId, BlockHash>>;

    /// The latest-messages map resolved to metadata.
    async fn latest_messages(&self) -> DagStoreResult<HashMap<ValidatorId, Arc<BlockMetadata>>>;

    /// Force a checkpoint rollover. No-op on the in-memory store and on an
    /// empty active log.
    async fn checkpoint(&self) -> DagStoreResult<()>;

    /// Atomically empty every store and truncate every log.
    async fn clear(&self) -> DagStoreResult<()>;

    /// Flush and release file handles. Subsequent operations fail with
    /// [`DagStoreError::StoreClosed`].
    async fn close(&self) -> DagStoreResult<()>;

    /// Point-in-time counters.
    async fn stats(&self) -> DagStoreResult<DagStoreStats>;
}

fn check_validator(block: &BlockMetadata) -> DagStoreResult<()> {
    if !block.validator.is_well_formed() {
        return Err(DagStoreError::MalformedValidator {
            len: block.validator.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Persistent store
// ============================================================================

struct PersistentInner {
    state: DagState,
    metadata_log: BlockMetadataLog,
    latest_log: LatestMessagesLog,
    snapshot: Option<Arc<DagRepresentation>>,
    closed: bool,
}

impl PersistentInner {
    fn check_open(&self) -> DagStoreResult<()> {
        if self.closed {
            return Err(DagStoreError::StoreClosed);
        }
        Ok(())
    }

    fn snapshot(&mut self) -> Arc<DagRepresentation> {
        if let Some(snapshot) = &self.snapshot {
            return snapshot.clone();
        }
        let snapshot = Arc::new(self.state.snapshot());
        self.snapshot = Some(snapshot.clone());
        snapshot
    }
}

/// The on-disk DAG store: framed logs, CRC sidecars and checkpoints under
/// one data directory.
pub struct PersistentDagStore {
    inner: Mutex<PersistentInner>,
}

impl PersistentDagStore {
    /// Open (or create) the store under `config.data_dir`, replaying the
    /// logs with the crash-recovery policy.
    pub async fn open(config: DagStorageConfig) -> DagStoreResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let (metadata_log, blocks) = BlockMetadataLog::open(
            &config.data_dir,
            config.max_size_factor,
            config.checkpoint_size_bytes,
            config.sync_on_write,
        )?;
        let (latest_log, latest_entries) = LatestMessagesLog::open(
            &config.data_dir,
            config.latest_messages_max_size_factor,
            config.sync_on_write,
        )?;

        let mut state = DagState::new();
        for block in blocks {
            state.replay(block);
        }
        state.restore_latest(latest_entries);

        info!(
            dir = %config.data_dir.display(),
            blocks = state.metadata.len(),
            validators = state.latest.len(),
            "persistent DAG store opened"
        );

        Ok(Self {
            inner: Mutex::new(PersistentInner {
                state,
                metadata_log,
                latest_log,
                snapshot: None,
                closed: false,
            }),
        })
    }
}

#[async_trait]
impl DagStore for PersistentDagStore {
    async fn insert(&self, mut block: BlockMetadata) -> DagStoreResult<Arc<DagRepresentation>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        check_validator(&block)?;

        if inner.state.contains(&block.hash) {
            debug!(hash = %block.hash, "insert of known block is a no-op");
            return Ok(inner.snapshot());
        }

        block.rank = inner.state.assign_rank(&block.parents);
        let updates = inner.state.latest_updates(&block);

        // Disk first. Nothing below mutates memory until every file
        // operation has succeeded, which is what makes rollback trivial.
        inner.metadata_log.append(&block)?;
        for (validator, hash) in &updates {
            inner.latest_log.append(validator, hash)?;
        }
        inner.metadata_log.maybe_roll()?;

        let mut new_latest = inner.state.latest.clone();
        for (validator, hash) in &updates {
            new_latest.insert(validator.clone(), *hash);
        }
        inner.latest_log.maybe_squash(new_latest.iter())?;

        let meta = Arc::new(block);
        debug!(hash = %meta.hash, rank = meta.rank, "block inserted");
        inner.state.apply(meta, &updates);
        inner.snapshot = None;
        Ok(inner.snapshot())
    }

    async fn get_representation(&self) -> DagStoreResult<Arc<DagRepresentation>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot())
    }

    async fn contains(&self, hash: &BlockHash) -> DagStoreResult<bool> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.contains(hash))
    }

    async fn lookup(&self, hash: &BlockHash) -> DagStoreResult<Option<Arc<BlockMetadata>>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.metadata.get(hash).cloned())
    }

    async fn children(
        &self,
        hash: &BlockHash,
    ) -> DagStoreResult<Option<std::collections::HashSet<BlockHash>>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot().children(hash))
    }

    async fn justification_to_blocks(
        &self,
        hash: &BlockHash,
    ) -> DagStoreResult<Option<std::collections::HashSet<BlockHash>>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot().justification_to_blocks(hash))
    }

    async fn latest_message_hash(
        &self,
        validator: &ValidatorId,
    ) -> DagStoreResult<Option<BlockHash>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.latest.get(validator).copied())
    }

    async fn latest_message(
        &self,
        validator: &ValidatorId,
    ) -> DagStoreResult<Option<Arc<BlockMetadata>>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner
            .state
            .latest
            .get(validator)
            .and_then(|hash| inner.state.metadata.get(hash))
            .cloned())
    }

    async fn latest_message_hashes(&self) -> DagStoreResult<HashMap<ValidatorId, BlockHash>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.latest.clone())
    }

    async fn latest_messages(&self) -> DagStoreResult<HashMap<ValidatorId, Arc<BlockMetadata>>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot().latest_messages())
    }

    async fn checkpoint(&self) -> DagStoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        inner.metadata_log.roll()?;
        Ok(())
    }

    async fn clear(&self) -> DagStoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        inner.metadata_log.clear()?;
        inner.latest_log.clear()?;
        inner.state.clear();
        inner.snapshot = None;
        info!("DAG store cleared");
        Ok(())
    }

    async fn close(&self) -> DagStoreResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Ok(());
        }
        inner.metadata_log.close()?;
        inner.latest_log.close()?;
        inner.closed = true;
        info!("DAG store closed");
        Ok(())
    }

    async fn stats(&self) -> DagStoreResult<DagStoreStats> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(DagStoreStats {
            block_count: inner.state.metadata.len(),
            rank_count: inner.state.index.rank_count(),
            latest_entries: inner.state.latest.len(),
            metadata_log_bytes: inner.metadata_log.active_log_bytes(),
            latest_log_records: inner.latest_log.record_count(),
            checkpoint_count: inner.metadata_log.checkpoint_count()?,
        })
    }
}

// ============================================================================
// In-memory store
// ============================================================================

struct InMemInner {
    state: DagState,
    snapshot: Option<Arc<DagRepresentation>>,
    closed: bool,
}

impl InMemInner {
    fn check_open(&self) -> DagStoreResult<()> {
        if self.closed {
            return Err(DagStoreError::StoreClosed);
        }
        Ok(())
    }

    fn snapshot(&mut self) -> Arc<DagRepresentation> {
        if let Some(snapshot) = &self.snapshot {
            return snapshot.clone();
        }
        let snapshot = Arc::new(self.state.snapshot());
        self.snapshot = Some(snapshot.clone());
        snapshot
    }
}

/// A DAG store with no persistence, for tests and light tooling.
///
/// Semantics match [`PersistentDagStore`] exactly; `checkpoint` is an
/// idempotent no-op.
#[derive(Default)]
pub struct InMemDagStore {
    inner: Mutex<InMemInner>,
}

impl Default for InMemInner {
    fn default() -> Self {
        Self {
            state: DagState::new(),
            snapshot: None,
            closed: false,
        }
    }
}

impl InMemDagStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DagStore for InMemDagStore {
    async fn insert(&self, mut block: BlockMetadata) -> DagStoreResult<Arc<DagRepresentation>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        check_validator(&block)?;

        if inner.state.contains(&block.hash) {
            return Ok(inner.snapshot());
        }

        block.rank = inner.state.assign_rank(&block.parents);
        let updates = inner.state.latest_updates(&block);
        inner.state.apply(Arc::new(block), &updates);
        inner.snapshot = None;
        Ok(inner.snapshot())
    }

    async fn get_representation(&self) -> DagStoreResult<Arc<DagRepresentation>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot())
    }

    async fn contains(&self, hash: &BlockHash) -> DagStoreResult<bool> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.contains(hash))
    }

    async fn lookup(&self, hash: &BlockHash) -> DagStoreResult<Option<Arc<BlockMetadata>>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.metadata.get(hash).cloned())
    }

    async fn children(
        &self,
        hash: &BlockHash,
    ) -> DagStoreResult<Option<std::collections::HashSet<BlockHash>>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot().children(hash))
    }

    async fn justification_to_blocks(
        &self,
        hash: &BlockHash,
    ) -> DagStoreResult<Option<std::collections::HashSet<BlockHash>>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot().justification_to_blocks(hash))
    }

    async fn latest_message_hash(
        &self,
        validator: &ValidatorId,
    ) -> DagStoreResult<Option<BlockHash>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.latest.get(validator).copied())
    }

    async fn latest_message(
        &self,
        validator: &ValidatorId,
    ) -> DagStoreResult<Option<Arc<BlockMetadata>>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner
            .state
            .latest
            .get(validator)
            .and_then(|hash| inner.state.metadata.get(hash))
            .cloned())
    }

    async fn latest_message_hashes(&self) -> DagStoreResult<HashMap<ValidatorId, BlockHash>> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.state.latest.clone())
    }

    async fn latest_messages(&self) -> DagStoreResult<HashMap<ValidatorId, Arc<BlockMetadata>>> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(inner.snapshot().latest_messages())
    }

    async fn checkpoint(&self) -> DagStoreResult<()> {
        let inner = self.inner.lock().await;
        inner.check_open()
    }

    async fn clear(&self) -> DagStoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_open()?;
        inner.state.clear();
        inner.snapshot = None;
        Ok(())
    }

    async fn close(&self) -> DagStoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        Ok(())
    }

    async fn stats(&self) -> DagStoreResult<DagStoreStats> {
        let inner = self.inner.lock().await;
        inner.check_open()?;
        Ok(DagStoreStats {
            block_count: inner.state.metadata.len(),
            rank_count: inner.state.index.rank_count(),
            latest_entries: inner.state.latest.len(),
            ..DagStoreStats::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn hash(n: u8) -> BlockHash {
        BlockHash::new([n; 32])
    }

    fn block(n: u8, parents: Vec<BlockHash>, validator: ValidatorId) -> BlockMetadata {
        BlockMetadata::new(hash(n), parents, vec![], validator, 0, BTreeSet::new())
    }

    #[tokio::test]
    async fn test_in_mem_insert_and_query() {
        let store = InMemDagStore::new();
        store
            .insert(block(1, vec![], ValidatorId::new([b'A'; 32])))
            .await
            .unwrap();
        let dag = store
            .insert(block(2, vec![hash(1)], ValidatorId::new([b'B'; 32])))
            .await
            .unwrap();

        assert!(dag.contains(&hash(1)));
        assert_eq!(dag.lookup(&hash(2)).unwrap().rank, 1);
        assert!(store.contains(&hash(2)).await.unwrap());
        assert_eq!(
            store.children(&hash(1)).await.unwrap(),
            Some([hash(2)].into())
        );
    }

    #[tokio::test]
    async fn test_in_mem_malformed_validator() {
        let store = InMemDagStore::new();
        let result = store
            .insert(block(1, vec![], ValidatorId::from_bytes(vec![b'X'; 16])))
            .await;
        assert!(matches!(
            result,
            Err(DagStoreError::MalformedValidator { len: 16 })
        ));
        assert_eq!(store.stats().await.unwrap().block_count, 0);
    }

    #[tokio::test]
    async fn test_in_mem_close_rejects_operations() {
        let store = InMemDagStore::new();
        store.close().await.unwrap();
        assert!(matches!(
            store.contains(&hash(1)).await,
            Err(DagStoreError::StoreClosed)
        ));
        assert!(matches!(
            store.insert(block(1, vec![], ValidatorId::empty())).await,
            Err(DagStoreError::StoreClosed)
        ));
    }

    #[tokio::test]
    async fn test_in_mem_checkpoint_is_noop() {
        let store = InMemDagStore::new();
        store.checkpoint().await.unwrap();
        store.checkpoint().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_mem_clear() {
        let store = InMemDagStore::new();
        store
            .insert(block(1, vec![], ValidatorId::new([b'A'; 32])))
            .await
            .unwrap();
        store.clear().await.unwrap();

        let dag = store.get_representation().await.unwrap();
        assert_eq!(dag.block_count(), 0);
        assert!(dag.latest_message_hashes().is_empty());
        assert_eq!(dag.rank_count(), 0);
        assert!(!store.contains(&hash(1)).await.unwrap());
    }
}
