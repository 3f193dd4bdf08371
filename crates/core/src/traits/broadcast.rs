//! Fire-and-forget peer broadcast.
//!
//! The genesis ceremony streams tagged payloads to every connected peer. The
//! transport promises nothing: no acknowledgement, no delivery guarantee, no
//! error surface. Dropped messages are retried implicitly because the
//! ceremony rebroadcasts on every poll tick.

use async_trait::async_trait;

/// Fan-out of a tagged payload to all peers.
#[async_trait]
pub trait Broadcast: Send + Sync {
    /// Stream `bytes` under `tag` to every peer. Fire-and-forget.
    async fn stream_to_peers(&self, tag: &str, bytes: &[u8]);
}

/// A broadcast that goes nowhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcast;

#[async_trait]
impl Broadcast for NoopBroadcast {
    async fn stream_to_peers(&self, _tag: &str, _bytes: &[u8]) {}
}
