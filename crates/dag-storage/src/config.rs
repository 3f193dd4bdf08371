//! Configuration for the persistent DAG store.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

/// Configuration for [`PersistentDagStore`](crate::PersistentDagStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagStorageConfig {
    /// Directory holding the logs, CRC sidecars and `checkpoints/`.
    pub data_dir: PathBuf,

    /// The active metadata log rolls into a checkpoint once it exceeds
    /// `max_size_factor * checkpoint_size_bytes`.
    pub max_size_factor: u64,

    /// Base size for the checkpoint rollover threshold, in bytes.
    pub checkpoint_size_bytes: u64,

    /// The latest-messages log is squashed once its record count exceeds
    /// `latest_messages_max_size_factor * max(validator_count, 1)`.
    pub latest_messages_max_size_factor: u64,

    /// Whether to fsync after each committed append.
    pub sync_on_write: bool,
}

impl DagStorageConfig {
    /// Configuration rooted at `data_dir` with default thresholds.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Validate threshold settings.
    pub fn validate(&self) -> io::Result<()> {
        if self.max_size_factor == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "max_size_factor must be at least 1",
            ));
        }
        if self.checkpoint_size_bytes == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "checkpoint_size_bytes must be at least 1",
            ));
        }
        if self.latest_messages_max_size_factor == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "latest_messages_max_size_factor must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for DagStorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/block-dag"),
            max_size_factor: 10,
            checkpoint_size_bytes: 1024 * 1024,
            latest_messages_max_size_factor: 10,
            sync_on_write: true,
        }
    }
}
