//! Genesis ceremony wire messages.
//!
//! These are the four messages exchanged during the approval ceremony, plus
//! the [`Signature`] triple they carry. Each message has a stable binary
//! encoding in the same length-prefixed style as the metadata record; the
//! candidate's [`canonical_bytes`](ApprovedBlockCandidate::canonical_bytes)
//! are the exact bytes whose Blake2b-256 digest approvers sign.

use crate::block::ByteReader;
use crate::{BlockMetadata, CodecError};

/// The signature algorithm accepted by the approval ceremony.
pub const ED25519_ALGORITHM: &str = "ed25519";

/// A detached signature triple carried by a [`BlockApproval`].
///
/// Approvals are deduplicated by the full triple, so equality and hashing
/// cover every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// The signer's Ed25519 public key (32 bytes).
    pub pubkey: Vec<u8>,
    /// The signature algorithm. Only `"ed25519"` is accepted.
    pub algorithm: String,
    /// The signature bytes (64 bytes for Ed25519).
    pub sig: Vec<u8>,
}

impl Signature {
    /// Creates an Ed25519 signature triple.
    pub fn ed25519(pubkey: impl Into<Vec<u8>>, sig: impl Into<Vec<u8>>) -> Self {
        Self {
            pubkey: pubkey.into(),
            algorithm: ED25519_ALGORITHM.to_string(),
            sig: sig.into(),
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.pubkey.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.pubkey);
        out.extend_from_slice(&(self.algorithm.len() as u32).to_le_bytes());
        out.extend_from_slice(self.algorithm.as_bytes());
        out.extend_from_slice(&(self.sig.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.sig);
    }

    fn decode_from(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let pubkey_len = reader.read_u32()? as usize;
        let pubkey = reader.read_bytes(pubkey_len)?.to_vec();
        let algorithm_len = reader.read_u32()? as usize;
        let algorithm = std::str::from_utf8(reader.read_bytes(algorithm_len)?)
            .map_err(|_| CodecError::InvalidUtf8("algorithm"))?
            .to_string();
        let sig_len = reader.read_u32()? as usize;
        let sig = reader.read_bytes(sig_len)?.to_vec();
        Ok(Self {
            pubkey,
            algorithm,
            sig,
        })
    }
}

/// The block proposed for approval, paired with the signature threshold the
/// bootstrap node demands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedBlockCandidate {
    /// The candidate genesis block.
    pub block: BlockMetadata,
    /// Number of distinct trusted signatures required.
    pub required_sigs: u32,
}

impl ApprovedBlockCandidate {
    /// Creates a candidate.
    pub fn new(block: BlockMetadata, required_sigs: u32) -> Self {
        Self {
            block,
            required_sigs,
        }
    }

    /// The canonical serialisation of the candidate.
    ///
    /// Approvers sign the Blake2b-256 digest of exactly these bytes, so the
    /// layout is as much a part of the wire contract as the messages
    /// themselves.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let block_bytes = self.block.to_bytes();
        let mut out = Vec::with_capacity(4 + block_bytes.len() + 4);
        out.extend_from_slice(&(block_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&block_bytes);
        out.extend_from_slice(&self.required_sigs.to_le_bytes());
        out
    }

    fn decode_from(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let block_len = reader.read_u32()? as usize;
        let block = BlockMetadata::from_bytes(reader.read_bytes(block_len)?)?;
        let required_sigs = reader.read_u32()?;
        Ok(Self {
            block,
            required_sigs,
        })
    }

    /// Serializes the candidate.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.canonical_bytes()
    }

    /// Deserializes a candidate, rejecting trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(data);
        let candidate = Self::decode_from(&mut reader)?;
        reader.finish()?;
        Ok(candidate)
    }
}

/// The bootstrap node's periodic broadcast: "this is the candidate, the
/// ceremony started at `timestamp_millis` and runs for `duration_millis`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnapprovedBlock {
    /// The candidate under ceremony.
    pub candidate: ApprovedBlockCandidate,
    /// Ceremony start, unix millis.
    pub timestamp_millis: i64,
    /// Minimum ceremony duration in millis.
    pub duration_millis: i64,
}

impl UnapprovedBlock {
    /// Serializes the message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let candidate = self.candidate.canonical_bytes();
        let mut out = Vec::with_capacity(4 + candidate.len() + 16);
        out.extend_from_slice(&(candidate.len() as u32).to_le_bytes());
        out.extend_from_slice(&candidate);
        out.extend_from_slice(&self.timestamp_millis.to_le_bytes());
        out.extend_from_slice(&self.duration_millis.to_le_bytes());
        out
    }

    /// Deserializes the message, rejecting trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(data);
        let candidate_len = reader.read_u32()? as usize;
        let candidate = ApprovedBlockCandidate::from_bytes(reader.read_bytes(candidate_len)?)?;
        let timestamp_millis = reader.read_i64()?;
        let duration_millis = reader.read_i64()?;
        reader.finish()?;
        Ok(Self {
            candidate,
            timestamp_millis,
            duration_millis,
        })
    }
}

/// A validator's vote for the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockApproval {
    /// The candidate the signature covers.
    pub candidate: ApprovedBlockCandidate,
    /// The approver's signature over the candidate digest.
    pub signature: Signature,
}

impl BlockApproval {
    /// Creates an approval.
    pub fn new(candidate: ApprovedBlockCandidate, signature: Signature) -> Self {
        Self {
            candidate,
            signature,
        }
    }

    /// Serializes the message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let candidate = self.candidate.canonical_bytes();
        let mut out = Vec::with_capacity(4 + candidate.len() + 64);
        out.extend_from_slice(&(candidate.len() as u32).to_le_bytes());
        out.extend_from_slice(&candidate);
        self.signature.encode_into(&mut out);
        out
    }

    /// Deserializes the message, rejecting trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(data);
        let candidate_len = reader.read_u32()? as usize;
        let candidate = ApprovedBlockCandidate::from_bytes(reader.read_bytes(candidate_len)?)?;
        let signature = Signature::decode_from(&mut reader)?;
        reader.finish()?;
        Ok(Self {
            candidate,
            signature,
        })
    }
}

/// The ceremony's output: the candidate plus every admitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedBlock {
    /// The approved candidate.
    pub candidate: ApprovedBlockCandidate,
    /// The admitted signatures, in admission order.
    pub signatures: Vec<Signature>,
}

impl ApprovedBlock {
    /// Creates an approved block.
    pub fn new(candidate: ApprovedBlockCandidate, signatures: Vec<Signature>) -> Self {
        Self {
            candidate,
            signatures,
        }
    }

    /// Serializes the message.
    pub fn to_bytes(&self) -> Vec<u8> {
        let candidate = self.candidate.canonical_bytes();
        let mut out = Vec::with_capacity(4 + candidate.len() + 4);
        out.extend_from_slice(&(candidate.len() as u32).to_le_bytes());
        out.extend_from_slice(&candidate);
        out.extend_from_slice(&(self.signatures.len() as u32).to_le_bytes());
        for signature in &self.signatures {
            signature.encode_into(&mut out);
        }
        out
    }

    /// Deserializes the message, rejecting trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(data);
        let candidate_len = reader.read_u32()? as usize;
        let candidate = ApprovedBlockCandidate::from_bytes(reader.read_bytes(candidate_len)?)?;
        let signature_count = reader.read_u32()? as usize;
        let mut signatures = Vec::with_capacity(signature_count.min(1024));
        for _ in 0..signature_count {
            signatures.push(Signature::decode_from(&mut reader)?);
        }
        reader.finish()?;
        Ok(Self {
            candidate,
            signatures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockHash, ValidatorId};
    use std::collections::BTreeSet;

    fn candidate() -> ApprovedBlockCandidate {
        let block = BlockMetadata::new(
            BlockHash::new([0x01; 32]),
            vec![],
            vec![],
            ValidatorId::empty(),
            0,
            BTreeSet::from([ValidatorId::new([0x41; 32])]),
        );
        ApprovedBlockCandidate::new(block, 3)
    }

    #[test]
    fn test_candidate_roundtrip() {
        let c = candidate();
        let back = ApprovedBlockCandidate::from_bytes(&c.to_bytes()).unwrap();
        assert_eq!(c, back);
    }

    #[test]
    fn test_canonical_bytes_deterministic() {
        assert_eq!(candidate().canonical_bytes(), candidate().canonical_bytes());
    }

    #[test]
    fn test_unapproved_block_roundtrip() {
        let msg = UnapprovedBlock {
            candidate: candidate(),
            timestamp_millis: 1_700_000_000_000,
            duration_millis: 30_000,
        };
        let back = UnapprovedBlock::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn test_approval_roundtrip() {
        let approval = BlockApproval::new(
            candidate(),
            Signature::ed25519(vec![0x41; 32], vec![0x99; 64]),
        );
        let back = BlockApproval::from_bytes(&approval.to_bytes()).unwrap();
        assert_eq!(approval, back);
    }

    #[test]
    fn test_approved_block_roundtrip() {
        let approved = ApprovedBlock::new(
            candidate(),
            vec![
                Signature::ed25519(vec![0x41; 32], vec![0x01; 64]),
                Signature::ed25519(vec![0x42; 32], vec![0x02; 64]),
            ],
        );
        let back = ApprovedBlock::from_bytes(&approved.to_bytes()).unwrap();
        assert_eq!(approved, back);
    }

    #[test]
    fn test_signatures_distinct_by_triple() {
        use std::collections::HashSet;
        let a = Signature::ed25519(vec![0x41; 32], vec![0x01; 64]);
        let b = Signature::ed25519(vec![0x41; 32], vec![0x02; 64]);
        let set: HashSet<_> = [a.clone(), b.clone(), a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
