//! Error types for the DAG storage layer.

use thiserror::Error;

/// Errors surfaced by DAG store operations.
#[derive(Debug, Error)]
pub enum DagStoreError {
    /// The block's validator field is non-empty and not exactly 32 bytes.
    ///
    /// Raised by `insert` before any log state is modified.
    #[error("malformed validator: expected empty or 32 bytes, got {len}")]
    MalformedValidator {
        /// The rejected length.
        len: usize,
    },

    /// The store was closed; the instance cannot be used again.
    #[error("store is closed")]
    StoreClosed,

    /// A filesystem operation failed. In-memory state was rolled back, the
    /// previous snapshot remains authoritative and the caller may retry.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record failed to decode outside of the tolerated
    /// trailing-corruption window.
    #[error("corrupt record: {0}")]
    Corrupt(#[from] arbor_types::CodecError),
}

/// Result type for DAG store operations.
pub type DagStoreResult<T> = Result<T, DagStoreError>;
