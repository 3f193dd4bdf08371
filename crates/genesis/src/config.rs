//! Configuration for the approval ceremony.

use arbor_types::ValidatorId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::time::Duration;

/// Configuration for [`GenesisApprover`](crate::GenesisApprover).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverConfig {
    /// Distinct trusted signatures required before the candidate is
    /// approved. Zero approves the candidate on the first poll tick.
    pub required_sigs: u32,

    /// The trusted approver set `V`.
    pub trusted_validators: HashSet<ValidatorId>,

    /// Minimum ceremony duration in milliseconds.
    pub duration_millis: i64,

    /// Poll interval in milliseconds.
    pub interval_millis: u64,
}

impl ApproverConfig {
    /// The poll interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }

    /// Validate the ceremony parameters.
    pub fn validate(&self) -> io::Result<()> {
        if self.interval_millis == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "interval_millis must be at least 1",
            ));
        }
        if self.duration_millis < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "duration_millis must not be negative",
            ));
        }
        if self.required_sigs as usize > self.trusted_validators.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "required_sigs exceeds the trusted validator set",
            ));
        }
        Ok(())
    }
}

impl Default for ApproverConfig {
    fn default() -> Self {
        Self {
            required_sigs: 0,
            trusted_validators: HashSet::new(),
            duration_millis: 5 * 60 * 1000,
            interval_millis: 5_000,
        }
    }
}
