//! Integration tests for the persistent DAG store: the end-to-end insert /
//! query / reopen scenarios, including crash tolerance and checkpointing.

use arbor_dag_storage::{
    DagRepresentation, DagStorageConfig, DagStore, DagStoreError, PersistentDagStore,
    CHECKPOINTS_DIR_NAME, LATEST_MESSAGES_LOG_NAME, METADATA_LOG_NAME,
};
use arbor_types::{BlockHash, BlockMetadata, ValidatorId};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn hash(n: u8) -> BlockHash {
    BlockHash::new([n; 32])
}

fn validator(c: u8) -> ValidatorId {
    ValidatorId::new([c; 32])
}

fn block(n: u8, parents: Vec<BlockHash>, author: ValidatorId) -> BlockMetadata {
    BlockMetadata::new(hash(n), parents, vec![], author, 0, BTreeSet::new())
}

fn config(dir: &Path) -> DagStorageConfig {
    DagStorageConfig {
        sync_on_write: false,
        ..DagStorageConfig::new(dir)
    }
}

async fn open(dir: &Path) -> PersistentDagStore {
    PersistentDagStore::open(config(dir)).await.unwrap()
}

fn assert_same_dag(a: &DagRepresentation, b: &DagRepresentation) {
    assert_eq!(a.block_count(), b.block_count());
    for (hash, meta) in a.metadata() {
        let other = b.lookup(hash).expect("block missing after reopen");
        assert_eq!(**meta, *other);
        assert_eq!(a.children(hash), b.children(hash));
        assert_eq!(a.justification_to_blocks(hash), b.justification_to_blocks(hash));
    }
    assert_eq!(a.latest_message_hashes(), b.latest_message_hashes());
    assert_eq!(a.topo_sort(0), b.topo_sort(0));
}

#[tokio::test]
async fn test_linear_chain_of_three() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;

    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
    store.insert(block(2, vec![hash(1)], validator(b'B'))).await.unwrap();
    let dag = store.insert(block(3, vec![hash(2)], validator(b'A'))).await.unwrap();

    assert_eq!(dag.latest_message_hash(&validator(b'A')), Some(hash(3)));
    assert_eq!(dag.latest_message_hash(&validator(b'B')), Some(hash(2)));
    assert_eq!(dag.latest_message_hashes().len(), 2);

    assert_eq!(
        dag.topo_sort(0),
        vec![vec![hash(1)], vec![hash(2)], vec![hash(3)]]
    );
    assert_eq!(dag.children(&hash(1)), Some([hash(2)].into()));
    assert_eq!(dag.children(&hash(2)), Some([hash(3)].into()));
    assert_eq!(dag.children(&hash(3)), Some(Default::default()));
}

#[tokio::test]
async fn test_genesis_with_empty_validator() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;

    store.insert(block(0, vec![], ValidatorId::empty())).await.unwrap();
    let dag = store.insert(block(1, vec![hash(0)], validator(b'A'))).await.unwrap();

    // The empty validator is never indexed in latest messages.
    assert_eq!(dag.latest_message_hashes().len(), 1);
    assert_eq!(dag.latest_message_hash(&validator(b'A')), Some(hash(1)));
    assert!(dag.contains(&hash(0)));
    assert_eq!(dag.lookup(&hash(0)).unwrap().rank, 0);
    assert_eq!(dag.lookup(&hash(1)).unwrap().rank, 1);
}

#[tokio::test]
async fn test_malformed_validator_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;
    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();

    let meta_len = std::fs::metadata(dir.path().join(METADATA_LOG_NAME)).unwrap().len();
    let latest_len = std::fs::metadata(dir.path().join(LATEST_MESSAGES_LOG_NAME)).unwrap().len();
    let before = store.get_representation().await.unwrap();

    let result = store
        .insert(block(2, vec![hash(1)], ValidatorId::from_bytes(vec![b'X'; 16])))
        .await;
    assert!(matches!(
        result,
        Err(DagStoreError::MalformedValidator { len: 16 })
    ));

    // Snapshot unchanged, log files unchanged in size.
    let after = store.get_representation().await.unwrap();
    assert_same_dag(&before, &after);
    assert_eq!(
        std::fs::metadata(dir.path().join(METADATA_LOG_NAME)).unwrap().len(),
        meta_len
    );
    assert_eq!(
        std::fs::metadata(dir.path().join(LATEST_MESSAGES_LOG_NAME)).unwrap().len(),
        latest_len
    );
}

#[tokio::test]
async fn test_snapshot_durable_across_reopen() {
    let dir = TempDir::new().unwrap();
    let before;
    {
        let store = open(dir.path()).await;
        store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
        store.insert(block(2, vec![hash(1)], validator(b'B'))).await.unwrap();
        before = store.insert(block(3, vec![hash(2)], validator(b'A'))).await.unwrap();
        store.close().await.unwrap();
    }

    let store = open(dir.path()).await;
    let after = store.get_representation().await.unwrap();
    assert_same_dag(&before, &after);
}

#[tokio::test]
async fn test_crash_garbage_on_latest_messages_log_tolerated() {
    let dir = TempDir::new().unwrap();
    let before;
    {
        let store = open(dir.path()).await;
        store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
        store.insert(block(2, vec![hash(1)], validator(b'B'))).await.unwrap();
        before = store.insert(block(3, vec![hash(2)], validator(b'A'))).await.unwrap();
        store.close().await.unwrap();
    }

    // 64 bytes of garbage, the shape a crashed 64-byte writer leaves behind.
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(dir.path().join(LATEST_MESSAGES_LOG_NAME))
        .unwrap();
    file.write_all(&[0xDE, 0xAD, 0xBE, 0xEF].repeat(16)).unwrap();
    drop(file);

    let store = open(dir.path()).await;
    let after = store.get_representation().await.unwrap();
    assert_same_dag(&before, &after);
}

#[tokio::test]
async fn test_crash_garbage_on_metadata_log_tolerated() {
    let dir = TempDir::new().unwrap();
    let before;
    {
        let store = open(dir.path()).await;
        store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
        before = store.insert(block(2, vec![hash(1)], validator(b'B'))).await.unwrap();
        store.close().await.unwrap();
    }

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(dir.path().join(METADATA_LOG_NAME))
        .unwrap();
    file.write_all(&[0x13, 0x37, 0x00, 0xFF].repeat(16)).unwrap();
    drop(file);

    let store = open(dir.path()).await;
    let after = store.get_representation().await.unwrap();
    assert_same_dag(&before, &after);
}

#[tokio::test]
async fn test_fully_garbled_logs_boot_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(dir.path().join(METADATA_LOG_NAME), [0xFF; 51]).unwrap();
    std::fs::write(dir.path().join(LATEST_MESSAGES_LOG_NAME), [0xFF; 29]).unwrap();

    let store = open(dir.path()).await;
    let dag = store.get_representation().await.unwrap();
    assert_eq!(dag.block_count(), 0);
    assert!(dag.latest_message_hashes().is_empty());
}

#[tokio::test]
async fn test_checkpoint_rollover_and_reopen() {
    let dir = TempDir::new().unwrap();
    let tight = DagStorageConfig {
        max_size_factor: 2,
        checkpoint_size_bytes: 100,
        sync_on_write: false,
        ..DagStorageConfig::new(dir.path())
    };

    let before;
    {
        let store = PersistentDagStore::open(tight.clone()).await.unwrap();
        let mut prev = None;
        for n in 1..=10u8 {
            let parents = prev.map(|p| vec![p]).unwrap_or_default();
            store.insert(block(n, parents, validator(b'A'))).await.unwrap();
            prev = Some(hash(n));
        }
        before = store.get_representation().await.unwrap();
        store.close().await.unwrap();
    }

    let names: Vec<String> = std::fs::read_dir(dir.path().join(CHECKPOINTS_DIR_NAME))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(!names.is_empty(), "expected at least one checkpoint");
    assert!(
        names.iter().any(|n| n.starts_with("0-")),
        "expected a checkpoint starting at record 0, got {names:?}"
    );

    let store = PersistentDagStore::open(tight).await.unwrap();
    let after = store.get_representation().await.unwrap();
    assert_same_dag(&before, &after);
}

#[tokio::test]
async fn test_forced_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;
    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
    store.checkpoint().await.unwrap();

    assert_eq!(store.stats().await.unwrap().checkpoint_count, 1);
    assert_eq!(store.stats().await.unwrap().metadata_log_bytes, 0);

    // Idempotent on an empty active log.
    store.checkpoint().await.unwrap();
    assert_eq!(store.stats().await.unwrap().checkpoint_count, 1);

    store.insert(block(2, vec![hash(1)], validator(b'B'))).await.unwrap();
    store.close().await.unwrap();

    let store = open(dir.path()).await;
    assert!(store.contains(&hash(1)).await.unwrap());
    assert!(store.contains(&hash(2)).await.unwrap());
}

#[tokio::test]
async fn test_clear_empties_stores_and_files() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;
    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
    store.insert(block(2, vec![hash(1)], validator(b'B'))).await.unwrap();
    store.checkpoint().await.unwrap();
    store.insert(block(3, vec![hash(2)], validator(b'A'))).await.unwrap();

    store.clear().await.unwrap();

    let dag = store.get_representation().await.unwrap();
    assert_eq!(dag.block_count(), 0);
    assert!(dag.latest_message_hashes().is_empty());
    assert_eq!(dag.rank_count(), 0);
    for n in 1..=3u8 {
        assert!(!store.contains(&hash(n)).await.unwrap());
    }
    assert_eq!(
        std::fs::metadata(dir.path().join(METADATA_LOG_NAME)).unwrap().len(),
        0
    );
    assert_eq!(
        std::fs::metadata(dir.path().join(LATEST_MESSAGES_LOG_NAME)).unwrap().len(),
        0
    );
    store.close().await.unwrap();

    // A cleared store stays cleared across reopen.
    let store = open(dir.path()).await;
    assert_eq!(store.get_representation().await.unwrap().block_count(), 0);
}

#[tokio::test]
async fn test_operations_after_close_fail() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;
    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
    store.close().await.unwrap();

    assert!(matches!(
        store.insert(block(2, vec![hash(1)], validator(b'B'))).await,
        Err(DagStoreError::StoreClosed)
    ));
    assert!(matches!(
        store.get_representation().await,
        Err(DagStoreError::StoreClosed)
    ));
    assert!(matches!(store.clear().await, Err(DagStoreError::StoreClosed)));

    // close is idempotent.
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_reinsert_known_block_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;
    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
    let bytes_before = store.stats().await.unwrap().metadata_log_bytes;

    let dag = store.insert(block(1, vec![], validator(b'A'))).await.unwrap();
    assert_eq!(dag.block_count(), 1);
    assert_eq!(store.stats().await.unwrap().metadata_log_bytes, bytes_before);
    assert_eq!(dag.topo_sort(0), vec![vec![hash(1)]]);
}

#[tokio::test]
async fn test_justifications_indexed_and_durable() {
    use arbor_types::Justification;

    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;
    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();

    let mut b2 = block(2, vec![hash(1)], validator(b'B'));
    b2.justifications = vec![Justification::new(validator(b'A'), hash(1))];
    let dag = store.insert(b2).await.unwrap();

    assert_eq!(dag.justification_to_blocks(&hash(1)), Some([hash(2)].into()));
    assert_eq!(dag.justification_to_blocks(&hash(2)), Some(Default::default()));
    assert_eq!(dag.justification_to_blocks(&hash(9)), None);
    store.close().await.unwrap();

    let store = open(dir.path()).await;
    assert_eq!(
        store.justification_to_blocks(&hash(1)).await.unwrap(),
        Some([hash(2)].into())
    );
}

#[tokio::test]
async fn test_latest_message_resolves_metadata() {
    let dir = TempDir::new().unwrap();
    let store = open(dir.path()).await;
    store.insert(block(1, vec![], validator(b'A'))).await.unwrap();

    let meta = store.latest_message(&validator(b'A')).await.unwrap().unwrap();
    assert_eq!(meta.hash, hash(1));
    assert!(store.latest_message(&validator(b'Z')).await.unwrap().is_none());

    let all = store.latest_messages().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[&validator(b'A')].hash, hash(1));
}
