//! # Arbor Crypto
//!
//! Cryptographic primitives for the Arbor consensus core:
//!
//! - **Blake2b-256** hashing for block digests and the genesis candidate
//!   digest ([`blake2b256`], [`Hasher`])
//! - **Ed25519** signature verification for approval ceremony votes
//!   ([`ed25519`])
//!
//! Signing keys never enter the consensus core; the approver only verifies
//! detached signatures against configured public keys. The [`ed25519::sign`]
//! helper exists for tests and tooling.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod ed25519;
pub mod hash;

pub use ed25519::{sign, verify};
pub use hash::{blake2b256, Hasher};
