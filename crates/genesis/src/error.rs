//! Error types for the genesis ceremony.

use thiserror::Error;

/// Reasons an approval is discarded. Every discard is logged; none of them
/// stops the ceremony.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    /// The approval covers a different candidate than the local one.
    #[error("approval is for a different candidate")]
    CandidateMismatch,

    /// The signer is not in the configured trusted-validator set.
    #[error("approver is not a trusted validator")]
    UntrustedApprover,

    /// Wrong algorithm, malformed key/signature, or the signature does not
    /// verify against the candidate digest.
    #[error("approval signature is invalid")]
    InvalidSignature,
}

/// Errors around the approved-block lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenesisError {
    /// No approved block yet; the ceremony is still running. Callers retry.
    #[error("genesis ceremony has not produced an approved block yet")]
    GenesisUnavailable,

    /// The last-approved slot only accepts one assignment.
    #[error("an approved block was already published")]
    AlreadyApproved,
}
