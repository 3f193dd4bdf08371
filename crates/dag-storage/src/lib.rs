//! # Arbor DAG Storage
//!
//! Persistent, crash-recoverable storage for the block DAG: every accepted
//! block's metadata, its parent and justification edges, per-validator
//! latest messages, and a rank-bucketed topological ordering.
//!
//! ## Layout on disk
//!
//! ```text
//! <data_dir>/
//!   block-metadata-log        framed metadata records
//!   block-metadata-crc        u32 le CRC-32 over all payloads
//!   latest-messages-log       framed (validator ‖ hash) records
//!   latest-messages-crc
//!   checkpoints/              rolled metadata segments, "<start>-<end>"
//! ```
//!
//! ## Crash recovery
//!
//! Logs are framed (`u32 le length ‖ payload`) with a CRC-32 sidecar.
//! On open, a torn or garbled tail is truncated at the last good offset and
//! the sidecar recomputed; a log with nothing recoverable opens empty. See
//! [`log`] for the codec and [`store`] for the façade contracts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_dag_storage::{DagStorageConfig, DagStore, PersistentDagStore};
//!
//! let store = PersistentDagStore::open(DagStorageConfig::new("./data/dag")).await?;
//! let dag = store.insert(block).await?;
//! assert!(dag.contains(&block_hash));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod index;
pub mod log;
mod latest_store;
mod metadata_store;
pub mod representation;
mod state;
pub mod store;

pub use config::DagStorageConfig;
pub use error::{DagStoreError, DagStoreResult};
pub use index::{BlockOrdering, DagIndex};
pub use latest_store::{LATEST_MESSAGES_CRC_NAME, LATEST_MESSAGES_LOG_NAME};
pub use log::{crc32, Crc32, FramedLog, FramedRecord, ReplayReport};
pub use metadata_store::{CHECKPOINTS_DIR_NAME, METADATA_CRC_NAME, METADATA_LOG_NAME};
pub use representation::DagRepresentation;
pub use store::{DagStore, DagStoreStats, InMemDagStore, PersistentDagStore};
