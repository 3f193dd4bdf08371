//! The persistent latest-messages log.
//!
//! Each update appends a framed 64-byte payload: the 32-byte validator key
//! followed by the 32-byte block hash. The in-memory map keeps one entry per
//! validator, so the log accumulates history until it is squashed: once the
//! record count exceeds `max_size_factor * max(|map|, 1)` the current map is
//! rewritten as a fresh log (one record per validator) and the old history
//! discarded.

use crate::log::{FramedLog, FramedRecord};
use arbor_types::{BlockHash, ValidatorId};
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// File name of the latest-messages log.
pub const LATEST_MESSAGES_LOG_NAME: &str = "latest-messages-log";

/// File name of the latest-messages log's CRC sidecar.
pub const LATEST_MESSAGES_CRC_NAME: &str = "latest-messages-crc";

/// Payload size: validator key plus block hash.
const ENTRY_SIZE: usize = 64;

/// The persistent side of the latest-messages store.
pub(crate) struct LatestMessagesLog {
    log: FramedLog,
    max_size_factor: u64,
}

impl LatestMessagesLog {
    /// Open the log under `dir`, replaying surviving entries in append
    /// order. Later entries for the same validator supersede earlier ones;
    /// the caller folds them into its map in order.
    pub fn open(
        dir: &Path,
        max_size_factor: u64,
        sync_on_write: bool,
    ) -> io::Result<(Self, Vec<(ValidatorId, BlockHash)>)> {
        let (mut log, records, report) = FramedLog::open(
            dir.join(LATEST_MESSAGES_LOG_NAME),
            dir.join(LATEST_MESSAGES_CRC_NAME),
            sync_on_write,
        )?;

        let mut replayed = Vec::with_capacity(records.len());
        decode_entries(&records, &mut replayed, &mut log)?;

        info!(
            entries = replayed.len(),
            truncated_bytes = report.truncated_bytes,
            "latest-messages log replayed"
        );
        Ok((
            Self {
                log,
                max_size_factor,
            },
            replayed,
        ))
    }

    /// Append one update.
    pub fn append(&mut self, validator: &ValidatorId, hash: &BlockHash) -> io::Result<()> {
        let mut payload = Vec::with_capacity(ENTRY_SIZE);
        payload.extend_from_slice(validator.as_bytes());
        payload.extend_from_slice(hash.as_bytes());
        self.log.append(&payload)
    }

    /// Squash the log down to `entries` if the history has outgrown the map.
    ///
    /// `entries` must be the post-update map contents; iteration order fixes
    /// the rewritten log's order.
    pub fn maybe_squash<'a>(
        &mut self,
        entries: impl ExactSizeIterator<Item = (&'a ValidatorId, &'a BlockHash)>,
    ) -> io::Result<()> {
        let threshold = self.max_size_factor * (entries.len() as u64).max(1);
        if self.log.record_count() <= threshold {
            return Ok(());
        }

        let payloads: Vec<Vec<u8>> = entries
            .map(|(validator, hash)| {
                let mut payload = Vec::with_capacity(ENTRY_SIZE);
                payload.extend_from_slice(validator.as_bytes());
                payload.extend_from_slice(hash.as_bytes());
                payload
            })
            .collect();

        let before = self.log.record_count();
        self.log.rewrite(&payloads)?;
        info!(
            records_before = before,
            records_after = payloads.len(),
            "latest-messages log squashed"
        );
        Ok(())
    }

    /// Truncate the log to zero length.
    pub fn clear(&mut self) -> io::Result<()> {
        self.log.clear()
    }

    /// Flush and release the file handle.
    pub fn close(&mut self) -> io::Result<()> {
        self.log.close()
    }

    /// Number of records currently in the log.
    pub fn record_count(&self) -> u64 {
        self.log.record_count()
    }
}

fn decode_entries(
    records: &[FramedRecord],
    out: &mut Vec<(ValidatorId, BlockHash)>,
    log: &mut FramedLog,
) -> io::Result<()> {
    for record in records {
        if record.payload.len() != ENTRY_SIZE {
            warn!(
                offset = record.offset,
                len = record.payload.len(),
                "latest-messages record has wrong size, dropping it and everything after"
            );
            log.truncate_to(record.offset)?;
            break;
        }
        let validator = ValidatorId::from_bytes(&record.payload[..32]);
        let hash = BlockHash::from_slice(&record.payload[32..]).expect("32-byte slice");
        debug!(validator = %validator, hash = %hash, "latest-message entry replayed");
        out.push((validator, hash));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn validator(n: u8) -> ValidatorId {
        ValidatorId::new([n; 32])
    }

    fn hash(n: u8) -> BlockHash {
        BlockHash::new([n; 32])
    }

    fn open(dir: &Path, factor: u64) -> (LatestMessagesLog, Vec<(ValidatorId, BlockHash)>) {
        LatestMessagesLog::open(dir, factor, false).unwrap()
    }

    #[test]
    fn test_append_replay_order() {
        let dir = TempDir::new().unwrap();
        let (mut log, replayed) = open(dir.path(), 10);
        assert!(replayed.is_empty());

        log.append(&validator(1), &hash(1)).unwrap();
        log.append(&validator(2), &hash(2)).unwrap();
        log.append(&validator(1), &hash(3)).unwrap();
        log.close().unwrap();

        let (_, replayed) = open(dir.path(), 10);
        assert_eq!(replayed.len(), 3);
        // Fold order: the validator(1) entry at index 2 supersedes index 0.
        assert_eq!(replayed[2], (validator(1), hash(3)));
    }

    #[test]
    fn test_squash_keeps_only_current_map() {
        let dir = TempDir::new().unwrap();
        let (mut log, _) = open(dir.path(), 2);

        let mut map = HashMap::new();
        for n in 0..10u8 {
            log.append(&validator(1), &hash(n)).unwrap();
            map.insert(validator(1), hash(n));
        }
        // 10 records for a 1-entry map with factor 2: squash fires.
        log.maybe_squash(map.iter()).unwrap();
        assert_eq!(log.record_count(), 1);
        log.close().unwrap();

        let (_, replayed) = open(dir.path(), 2);
        assert_eq!(replayed, vec![(validator(1), hash(9))]);
    }

    #[test]
    fn test_no_squash_below_threshold() {
        let dir = TempDir::new().unwrap();
        let (mut log, _) = open(dir.path(), 10);

        let mut map = HashMap::new();
        for n in 1..=3u8 {
            log.append(&validator(n), &hash(n)).unwrap();
            map.insert(validator(n), hash(n));
        }
        log.maybe_squash(map.iter()).unwrap();
        assert_eq!(log.record_count(), 3);
    }

    #[test]
    fn test_wrong_size_record_truncates() {
        let dir = TempDir::new().unwrap();
        let (mut log, _) = open(dir.path(), 10);
        log.append(&validator(1), &hash(1)).unwrap();
        log.close().unwrap();

        let (mut raw, _, _) = FramedLog::open(
            dir.path().join(LATEST_MESSAGES_LOG_NAME),
            dir.path().join(LATEST_MESSAGES_CRC_NAME),
            false,
        )
        .unwrap();
        raw.append(&[0xAA; 17]).unwrap();
        raw.close().unwrap();

        let (log, replayed) = open(dir.path(), 10);
        assert_eq!(replayed, vec![(validator(1), hash(1))]);
        assert_eq!(log.record_count(), 1);
    }
}
