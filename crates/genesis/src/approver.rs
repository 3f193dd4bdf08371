//! The genesis approval state machine.
//!
//! One [`GenesisApprover`] lives on the bootstrap node. Its state is the set
//! of admitted signatures plus the shared last-approved slot; its inputs are
//! the candidate, the threshold `N`, the trusted set `V`, the duration `D`
//! and the poll interval `I`.
//!
//! [`add_approval`](GenesisApprover::add_approval) validates and admits
//! signatures concurrently with the poll loop in [`run`](GenesisApprover::run).
//! A signature is admitted iff it covers the local candidate, its key is
//! trusted, its algorithm is `"ed25519"` and it verifies against the
//! Blake2b-256 digest of the candidate's canonical bytes. Admission is
//! idempotent per signature triple.

use crate::config::ApproverConfig;
use crate::error::ApprovalError;
use crate::last_approved::LastApprovedBlock;
use arbor_core::Effects;
use arbor_crypto::blake2b256;
use arbor_types::{
    ApprovedBlock, ApprovedBlockCandidate, BlockApproval, Signature, UnapprovedBlock,
    ValidatorId, ED25519_ALGORITHM,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Broadcast tag for the periodic candidate announcement.
pub const UNAPPROVED_BLOCK_TAG: &str = "unapproved-block";

/// Broadcast tag for the final approved block.
pub const APPROVED_BLOCK_TAG: &str = "approved-block";

/// Metrics counter incremented once per admitted signature.
const GENESIS_COUNTER: &str = "genesis";

/// The bootstrap side of the approval ceremony.
pub struct GenesisApprover {
    candidate: ApprovedBlockCandidate,
    digest: [u8; 32],
    config: ApproverConfig,
    effects: Effects,
    slot: Arc<LastApprovedBlock>,
    /// Admitted signatures in admission order. Deduplicated by full triple.
    sigs: Mutex<Vec<Signature>>,
    started_at: i64,
}

impl GenesisApprover {
    /// Create an approver for `candidate`. The ceremony clock starts now.
    pub fn new(
        candidate: ApprovedBlockCandidate,
        config: ApproverConfig,
        effects: Effects,
        slot: Arc<LastApprovedBlock>,
    ) -> Self {
        let digest = blake2b256(&candidate.canonical_bytes());
        let started_at = effects.clock.now_millis();
        info!(
            required_sigs = config.required_sigs,
            trusted = config.trusted_validators.len(),
            duration_millis = config.duration_millis,
            started_at,
            "genesis approval ceremony started"
        );
        Self {
            candidate,
            digest,
            config,
            effects,
            slot,
            sigs: Mutex::new(Vec::new()),
            started_at,
        }
    }

    /// The ceremony start time in unix millis.
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Number of admitted signatures.
    pub fn approval_count(&self) -> usize {
        self.sigs.lock().len()
    }

    /// The approved block, if the ceremony has finished.
    pub fn approved(&self) -> Option<ApprovedBlock> {
        self.slot.get()
    }

    /// Validate an incoming approval and admit its signature.
    ///
    /// Re-admitting a signature already in the set is `Ok` and changes
    /// nothing; only a first admission increments the `genesis` counter.
    /// Rejections are logged here, so callers may drop the error.
    pub fn add_approval(&self, approval: BlockApproval) -> Result<(), ApprovalError> {
        if approval.candidate != self.candidate {
            warn!("discarding approval for a different candidate");
            return Err(ApprovalError::CandidateMismatch);
        }

        let signature = approval.signature;
        let signer = ValidatorId::from_bytes(signature.pubkey.clone());
        if !self.config.trusted_validators.contains(&signer) {
            warn!(signer = %signer, "discarding approval from untrusted validator");
            return Err(ApprovalError::UntrustedApprover);
        }

        if signature.algorithm != ED25519_ALGORITHM {
            warn!(
                signer = %signer,
                algorithm = %signature.algorithm,
                "discarding approval with unsupported signature algorithm"
            );
            return Err(ApprovalError::InvalidSignature);
        }
        if !arbor_crypto::verify(&signature.pubkey, &self.digest, &signature.sig) {
            warn!(signer = %signer, "discarding approval with invalid signature");
            return Err(ApprovalError::InvalidSignature);
        }

        let mut sigs = self.sigs.lock();
        if sigs.contains(&signature) {
            debug!(signer = %signer, "duplicate approval, no-op");
            return Ok(());
        }
        sigs.push(signature);
        let count = sigs.len();
        drop(sigs);

        self.effects.metrics.increment_counter(GENESIS_COUNTER);
        info!(
            signer = %signer,
            count,
            required = self.config.required_sigs,
            "approval admitted"
        );
        Ok(())
    }

    /// Drive the ceremony to completion.
    ///
    /// Every interval: rebroadcast the candidate, then exit once the
    /// duration has elapsed with enough signatures (immediately when the
    /// threshold is zero). There is no timeout: past the duration the loop
    /// waits indefinitely for the final signature.
    ///
    /// Runs as one long-lived task. All externally visible writes happen
    /// between await points, so aborting the task is a clean cancellation:
    /// before `Approved`, nothing has been published.
    pub async fn run(self: Arc<Self>) -> ApprovedBlock {
        let unapproved = UnapprovedBlock {
            candidate: self.candidate.clone(),
            timestamp_millis: self.started_at,
            duration_millis: self.config.duration_millis,
        }
        .to_bytes();

        loop {
            self.effects
                .broadcast
                .stream_to_peers(UNAPPROVED_BLOCK_TAG, &unapproved)
                .await;

            let now = self.effects.clock.now_millis();
            let count = self.approval_count() as u32;
            let duration_elapsed = now >= self.started_at + self.config.duration_millis;
            if self.config.required_sigs == 0
                || (duration_elapsed && count >= self.config.required_sigs)
            {
                return self.approve().await;
            }

            debug!(
                count,
                required = self.config.required_sigs,
                duration_elapsed,
                "ceremony still waiting"
            );
            tokio::time::sleep(self.config.interval()).await;
        }
    }

    async fn approve(&self) -> ApprovedBlock {
        let approved = ApprovedBlock::new(self.candidate.clone(), self.sigs.lock().clone());
        info!(
            signatures = approved.signatures.len(),
            "genesis candidate approved"
        );

        if let Err(e) = self.slot.set(approved.clone()) {
            // Single-assignment: a second ceremony run must not replace it.
            warn!(error = %e, "last-approved slot was already populated");
        }
        self.effects
            .broadcast
            .stream_to_peers(APPROVED_BLOCK_TAG, &approved.to_bytes())
            .await;
        approved
    }
}
