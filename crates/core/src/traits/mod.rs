//! Capability traits for the Arbor consensus core.
//!
//! Each submodule defines one capability and a default implementation:
//!
//! - [`clock`] - wall-clock time
//! - [`metrics`] - best-effort counters
//! - [`broadcast`] - fire-and-forget peer fan-out
//! - [`block_store`] - content-addressed block payloads

mod block_store;
mod broadcast;
mod clock;
mod metrics;

pub use block_store::*;
pub use broadcast::*;
pub use clock::*;
pub use metrics::*;
