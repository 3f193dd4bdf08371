//! # Arbor Genesis
//!
//! The genesis approval ceremony: a time-bounded multi-signature protocol by
//! which a bootstrap node and a quorum of trusted validators agree on the
//! initial block before regular consensus starts.
//!
//! ## Protocol
//!
//! The bootstrap node holds an [`ApprovedBlockCandidate`] and polls on a
//! fixed interval. Every tick it rebroadcasts the candidate, then checks the
//! exit condition: either the configured duration has elapsed *and* the
//! required number of distinct trusted signatures has arrived, or the
//! required count is zero. On exit it materialises an [`ApprovedBlock`],
//! publishes it to the single-assignment [`LastApprovedBlock`] slot and
//! broadcasts it to peers.
//!
//! Approvals arrive concurrently via [`GenesisApprover::add_approval`];
//! untrusted or invalid ones are logged and discarded without counting.
//!
//! ## Properties
//!
//! - **Safety**: an approved block carries at least the required number of
//!   signatures from distinct trusted validators (or the requirement was
//!   zero).
//! - **Liveness**: the loop progresses whenever the clock advances and
//!   approvals arrive; past the duration it waits indefinitely for the last
//!   signature rather than timing out.
//!
//! [`ApprovedBlockCandidate`]: arbor_types::ApprovedBlockCandidate
//! [`ApprovedBlock`]: arbor_types::ApprovedBlock

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod approver;
pub mod config;
pub mod error;
pub mod last_approved;

pub use approver::{GenesisApprover, APPROVED_BLOCK_TAG, UNAPPROVED_BLOCK_TAG};
pub use config::ApproverConfig;
pub use error::{ApprovalError, GenesisError};
pub use last_approved::LastApprovedBlock;
