//! The persistent block metadata log.
//!
//! Every inserted block appends one framed [`BlockMetadata`] record to
//! `block-metadata-log`. When the active log grows past the configured
//! threshold it is rolled, atomically, into `checkpoints/<start>-<end>`
//! (global record indices, end exclusive) and a fresh log is started.
//!
//! Startup replays the checkpoints in ascending start order and then the
//! active log. A record that is framed correctly but fails to decode marks
//! the end of usable data: the active log is truncated at its offset and the
//! remainder dropped with a warning. Replay is idempotent per block hash, so
//! a record persisted by an insert whose later steps failed is harmless.

use crate::log::{read_records, FramedLog, FramedRecord};
use arbor_types::BlockMetadata;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the active metadata log.
pub const METADATA_LOG_NAME: &str = "block-metadata-log";

/// File name of the metadata log's CRC sidecar.
pub const METADATA_CRC_NAME: &str = "block-metadata-crc";

/// Directory holding rolled checkpoint segments.
pub const CHECKPOINTS_DIR_NAME: &str = "checkpoints";

/// The persistent side of the block metadata store.
pub(crate) struct BlockMetadataLog {
    log: FramedLog,
    checkpoints_dir: PathBuf,
    /// Global index of the first record in the active log.
    first_record_index: u64,
    /// Global count of records ever appended (checkpointed + active).
    total_records: u64,
    max_size_factor: u64,
    checkpoint_size_bytes: u64,
}

impl BlockMetadataLog {
    /// Open the metadata log under `dir`, replaying checkpoints and the
    /// active log. Returns the handle plus all surviving records in append
    /// order.
    pub fn open(
        dir: &Path,
        max_size_factor: u64,
        checkpoint_size_bytes: u64,
        sync_on_write: bool,
    ) -> io::Result<(Self, Vec<BlockMetadata>)> {
        let checkpoints_dir = dir.join(CHECKPOINTS_DIR_NAME);
        std::fs::create_dir_all(&checkpoints_dir)?;

        let mut replayed = Vec::new();
        let checkpoints = list_checkpoints(&checkpoints_dir)?;
        let mut first_record_index = 0u64;
        for checkpoint in &checkpoints {
            let records = read_records(&checkpoint.path)?;
            decode_records(&records, &checkpoint.path, &mut replayed, None)?;
            first_record_index = first_record_index.max(checkpoint.end);
        }

        let (mut log, records, report) = FramedLog::open(
            dir.join(METADATA_LOG_NAME),
            dir.join(METADATA_CRC_NAME),
            sync_on_write,
        )?;
        decode_records(
            &records,
            &dir.join(METADATA_LOG_NAME),
            &mut replayed,
            Some(&mut log),
        )?;

        let total_records = first_record_index + log.record_count();
        info!(
            blocks = replayed.len(),
            checkpoints = checkpoints.len(),
            truncated_bytes = report.truncated_bytes,
            "block metadata log replayed"
        );

        Ok((
            Self {
                log,
                checkpoints_dir,
                first_record_index,
                total_records,
                max_size_factor,
                checkpoint_size_bytes,
            },
            replayed,
        ))
    }

    /// Append one metadata record.
    pub fn append(&mut self, meta: &BlockMetadata) -> io::Result<()> {
        self.log.append(&meta.to_bytes())?;
        self.total_records += 1;
        Ok(())
    }

    /// Roll the active log into a checkpoint if it exceeds the threshold.
    pub fn maybe_roll(&mut self) -> io::Result<()> {
        if self.log.len_bytes() > self.max_size_factor * self.checkpoint_size_bytes {
            self.roll()?;
        }
        Ok(())
    }

    /// Force a checkpoint rollover. No-op when the active log is empty.
    pub fn roll(&mut self) -> io::Result<()> {
        if self.log.record_count() == 0 {
            return Ok(());
        }
        let name = format!("{}-{}", self.first_record_index, self.total_records);
        let target = self.checkpoints_dir.join(&name);
        self.log.roll_into(&target)?;
        info!(checkpoint = %name, "metadata log rolled into checkpoint");
        self.first_record_index = self.total_records;
        Ok(())
    }

    /// Truncate the active log and delete every checkpoint.
    pub fn clear(&mut self) -> io::Result<()> {
        self.log.clear()?;
        for checkpoint in list_checkpoints(&self.checkpoints_dir)? {
            std::fs::remove_file(&checkpoint.path)?;
        }
        self.first_record_index = 0;
        self.total_records = 0;
        Ok(())
    }

    /// Flush and release the file handle.
    pub fn close(&mut self) -> io::Result<()> {
        self.log.close()
    }

    /// Active log size in bytes.
    pub fn active_log_bytes(&self) -> u64 {
        self.log.len_bytes()
    }

    /// Number of checkpoint segments on disk.
    pub fn checkpoint_count(&self) -> io::Result<usize> {
        Ok(list_checkpoints(&self.checkpoints_dir)?.len())
    }
}

/// A parsed checkpoint file name.
struct Checkpoint {
    path: PathBuf,
    start: u64,
    end: u64,
}

/// List checkpoint segments in ascending start order, ignoring files whose
/// names do not parse as `<start>-<end>`.
fn list_checkpoints(dir: &Path) -> io::Result<Vec<Checkpoint>> {
    let mut checkpoints = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(checkpoint) = parse_checkpoint_name(name) else {
            warn!(file = name, "ignoring unrecognized file in checkpoints directory");
            continue;
        };
        checkpoints.push(Checkpoint {
            path: entry.path(),
            start: checkpoint.0,
            end: checkpoint.1,
        });
    }
    checkpoints.sort_by_key(|c| (c.start, c.end));
    Ok(checkpoints)
}

fn parse_checkpoint_name(name: &str) -> Option<(u64, u64)> {
    let (start, end) = name.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Decode framed records into metadata, applying the truncate-on-decode-error
/// policy to the active log (when `log` is given) and stop-and-warn to
/// immutable checkpoints.
fn decode_records(
    records: &[FramedRecord],
    path: &Path,
    out: &mut Vec<BlockMetadata>,
    mut log: Option<&mut FramedLog>,
) -> io::Result<()> {
    for record in records {
        match BlockMetadata::from_bytes(&record.payload) {
            Ok(meta) => {
                debug!(hash = %meta.hash, rank = meta.rank, "metadata record replayed");
                out.push(meta);
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    offset = record.offset,
                    error = %e,
                    "undecodable metadata record, dropping it and everything after"
                );
                if let Some(log) = log.as_deref_mut() {
                    log.truncate_to(record.offset)?;
                }
                break;
            }
        }
    }
    Ok(())
}
