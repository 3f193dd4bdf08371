//! # Arbor Types
//!
//! Core type definitions for the Arbor consensus node.
//!
//! This crate provides the fundamental types shared by the block DAG storage
//! and the genesis approval protocol:
//! - [`BlockHash`] - 32-byte block identifiers
//! - [`ValidatorId`] - validator public keys (empty only for the genesis block)
//! - [`BlockMetadata`] and [`Justification`] - the per-block DAG record
//! - [`ApprovedBlockCandidate`], [`BlockApproval`], [`ApprovedBlock`],
//!   [`UnapprovedBlock`] - the genesis ceremony wire messages
//!
//! All persisted and broadcast types carry a stable, hand-specified binary
//! encoding (`to_bytes`/`from_bytes`): field order and layout are part of the
//! external contract and must not change between releases.
//!
//! ## Example
//!
//! ```rust
//! use arbor_types::{BlockHash, ValidatorId, BlockMetadata};
//!
//! let hash = BlockHash::new([0xab; 32]);
//! let validator = ValidatorId::new([0x01; 32]);
//! let meta = BlockMetadata::new(hash, vec![], vec![], validator, 0, Default::default());
//! assert_eq!(meta.rank, 0);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod approval;
pub mod block;
pub mod hash;
pub mod validator;

pub use approval::{
    ApprovedBlock, ApprovedBlockCandidate, BlockApproval, Signature, UnapprovedBlock,
    ED25519_ALGORITHM,
};
pub use block::{BlockMetadata, Justification, Rank};
pub use hash::BlockHash;
pub use validator::ValidatorId;

/// Result type alias for Arbor type operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when constructing or parsing Arbor types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}

/// Errors raised while decoding a stable binary record.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The record ended before a field could be fully read.
    #[error("record truncated at offset {offset}: needed {needed} more bytes")]
    Truncated {
        /// Byte offset where the decoder stopped.
        offset: usize,
        /// Number of missing bytes.
        needed: usize,
    },

    /// The record carries an encoding version this build does not understand.
    #[error("unsupported record version: {0}")]
    UnsupportedVersion(u8),

    /// A declared length field is outside the permitted range.
    #[error("invalid {field} length: {len}")]
    InvalidFieldLength {
        /// Field whose length was rejected.
        field: &'static str,
        /// The rejected length.
        len: usize,
    },

    /// Decoding consumed the record but bytes remained.
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// A string field held non-UTF-8 bytes.
    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),
}
