//! # Arbor Core - Capability Abstractions
//!
//! This crate defines the small set of capabilities the consensus core
//! consumes from its environment:
//!
//! - **Clock**: wall-clock time for the genesis ceremony schedule
//! - **Metrics**: best-effort counters
//! - **Broadcast**: fire-and-forget peer fan-out
//! - **BlockStore**: content-addressed block payload storage
//!
//! The four are bundled into one [`Effects`] record. Components take the
//! record (or the individual `Arc<dyn ...>` handles) at construction; no
//! wider interface hierarchy exists, because the core needs nothing wider.
//!
//! # Design Philosophy
//!
//! 1. **Trait-based seams**: every capability is a trait, so tests swap in
//!    deterministic implementations without feature flags.
//! 2. **Minimal surface**: each trait carries exactly the methods the core
//!    calls, nothing speculative.
//! 3. **Thread safety**: all traits require `Send + Sync`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod effects;
pub mod traits;

pub use effects::Effects;
pub use traits::{
    BlockStore, BlockStoreError, BlockStoreResult, Broadcast, Clock, InMemBlockStore, Metrics,
    NoopBroadcast, NoopMetrics, SystemClock,
};
