//! Wall-clock abstraction.
//!
//! The genesis ceremony compares "now" against its configured start and
//! duration, so time is injected rather than read ambiently. Production code
//! uses [`SystemClock`]; timing tests supply their own implementation.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in unix milliseconds.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in milliseconds since the unix epoch.
    fn now_millis(&self) -> i64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}
