//! The capability record.
//!
//! All environmental effects the consensus core performs go through one
//! [`Effects`] value with four fields. Components that need fewer
//! capabilities clone the individual `Arc` handles they use.

use crate::traits::{BlockStore, Broadcast, Clock, Metrics};
use std::sync::Arc;

/// The four capabilities the consensus core consumes, as one record.
#[derive(Clone)]
pub struct Effects {
    /// Wall-clock time.
    pub clock: Arc<dyn Clock>,
    /// Best-effort counters.
    pub metrics: Arc<dyn Metrics>,
    /// Fire-and-forget peer fan-out.
    pub broadcast: Arc<dyn Broadcast>,
    /// Content-addressed block payloads.
    pub block_store: Arc<dyn BlockStore>,
}

impl Effects {
    /// Bundle four capability handles into a record.
    pub fn new(
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn Metrics>,
        broadcast: Arc<dyn Broadcast>,
        block_store: Arc<dyn BlockStore>,
    ) -> Self {
        Self {
            clock,
            metrics,
            broadcast,
            block_store,
        }
    }
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effects").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{InMemBlockStore, NoopBroadcast, NoopMetrics, SystemClock};

    #[test]
    fn test_effects_is_cloneable() {
        let effects = Effects::new(
            Arc::new(SystemClock),
            Arc::new(NoopMetrics),
            Arc::new(NoopBroadcast),
            Arc::new(InMemBlockStore::new()),
        );
        let cloned = effects.clone();
        assert!(cloned.clock.now_millis() > 0);
    }
}
