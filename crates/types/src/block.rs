//! Block metadata records and their stable binary encoding.
//!
//! [`BlockMetadata`] is the unit stored in the block metadata log. Its binary
//! layout is part of the on-disk contract: fields are written in a fixed
//! order with explicit little-endian length prefixes, so a log written by one
//! release replays on any other.
//!
//! ## Record layout (version 1)
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ version (1 byte, = 1)                                          │
//! ├────────────────────────────────────────────────────────────────┤
//! │ hash (32 bytes)                                                │
//! ├────────────────────────────────────────────────────────────────┤
//! │ parent_count (u32 le) ‖ parents (32 bytes each)                │
//! ├────────────────────────────────────────────────────────────────┤
//! │ justification_count (u32 le) ‖ (validator 32 ‖ hash 32) each   │
//! ├────────────────────────────────────────────────────────────────┤
//! │ validator_len (u32 le, 0 or 32) ‖ validator bytes              │
//! ├────────────────────────────────────────────────────────────────┤
//! │ rank (u64 le)                                                  │
//! ├────────────────────────────────────────────────────────────────┤
//! │ bonded_count (u32 le) ‖ bonded validators (32 each, ascending) │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use crate::hash::HASH_SIZE;
use crate::validator::VALIDATOR_ID_SIZE;
use crate::{BlockHash, CodecError, ValidatorId};
use std::collections::BTreeSet;

/// Topological rank of a block: 0 with no parents, else 1 + max parent rank.
pub type Rank = u64;

/// Current metadata record encoding version.
const RECORD_VERSION: u8 = 1;

/// A justification edge: which message from `validator` the block's author
/// had observed when creating the block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Justification {
    /// The validator whose message is cited.
    pub validator: ValidatorId,
    /// The cited block hash.
    pub latest_hash: BlockHash,
}

impl Justification {
    /// Creates a justification edge.
    pub fn new(validator: ValidatorId, latest_hash: BlockHash) -> Self {
        Self {
            validator,
            latest_hash,
        }
    }
}

/// The per-block record kept by the DAG: identity, edges, author, rank and
/// the validator set bonded as of this block.
///
/// Metadata is immutable once inserted; the DAG never mutates a stored
/// record, it only indexes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMetadata {
    /// The block's own hash.
    pub hash: BlockHash,
    /// Parent edges, in block order.
    pub parents: Vec<BlockHash>,
    /// Justification edges, in block order.
    pub justifications: Vec<Justification>,
    /// The block author. Empty only for the genesis block.
    pub validator: ValidatorId,
    /// Topological rank.
    pub rank: Rank,
    /// The active validator set as of this block.
    pub bonded_validators: BTreeSet<ValidatorId>,
}

impl BlockMetadata {
    /// Creates a metadata record.
    pub fn new(
        hash: BlockHash,
        parents: Vec<BlockHash>,
        justifications: Vec<Justification>,
        validator: ValidatorId,
        rank: Rank,
        bonded_validators: BTreeSet<ValidatorId>,
    ) -> Self {
        Self {
            hash,
            parents,
            justifications,
            validator,
            rank,
            bonded_validators,
        }
    }

    /// Serializes the record into its stable binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(RECORD_VERSION);
        out.extend_from_slice(self.hash.as_bytes());

        out.extend_from_slice(&(self.parents.len() as u32).to_le_bytes());
        for parent in &self.parents {
            out.extend_from_slice(parent.as_bytes());
        }

        out.extend_from_slice(&(self.justifications.len() as u32).to_le_bytes());
        for justification in &self.justifications {
            out.extend_from_slice(justification.validator.as_bytes());
            out.extend_from_slice(justification.latest_hash.as_bytes());
        }

        out.extend_from_slice(&(self.validator.len() as u32).to_le_bytes());
        out.extend_from_slice(self.validator.as_bytes());

        out.extend_from_slice(&self.rank.to_le_bytes());

        out.extend_from_slice(&(self.bonded_validators.len() as u32).to_le_bytes());
        // BTreeSet iteration is ascending, which fixes the on-disk order.
        for bonded in &self.bonded_validators {
            out.extend_from_slice(bonded.as_bytes());
        }

        out
    }

    /// Deserializes a record, rejecting trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(data);

        let version = reader.read_u8()?;
        if version != RECORD_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let hash = reader.read_hash()?;

        let parent_count = reader.read_u32()? as usize;
        let mut parents = Vec::with_capacity(parent_count.min(1024));
        for _ in 0..parent_count {
            parents.push(reader.read_hash()?);
        }

        let justification_count = reader.read_u32()? as usize;
        let mut justifications = Vec::with_capacity(justification_count.min(1024));
        for _ in 0..justification_count {
            let validator = ValidatorId::from_bytes(reader.read_bytes(VALIDATOR_ID_SIZE)?);
            let latest_hash = reader.read_hash()?;
            justifications.push(Justification::new(validator, latest_hash));
        }

        let validator_len = reader.read_u32()? as usize;
        if validator_len != 0 && validator_len != VALIDATOR_ID_SIZE {
            return Err(CodecError::InvalidFieldLength {
                field: "validator",
                len: validator_len,
            });
        }
        let validator = ValidatorId::from_bytes(reader.read_bytes(validator_len)?);

        let rank = reader.read_u64()?;

        let bonded_count = reader.read_u32()? as usize;
        let mut bonded_validators = BTreeSet::new();
        for _ in 0..bonded_count {
            bonded_validators.insert(ValidatorId::from_bytes(
                reader.read_bytes(VALIDATOR_ID_SIZE)?,
            ));
        }

        reader.finish()?;

        Ok(Self {
            hash,
            parents,
            justifications,
            validator,
            rank,
            bonded_validators,
        })
    }

    fn encoded_len(&self) -> usize {
        1 + HASH_SIZE
            + 4
            + self.parents.len() * HASH_SIZE
            + 4
            + self.justifications.len() * (VALIDATOR_ID_SIZE + HASH_SIZE)
            + 4
            + self.validator.len()
            + 8
            + 4
            + self.bonded_validators.len() * VALIDATOR_ID_SIZE
    }
}

/// Cursor over a binary record with bounds-checked reads.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, CodecError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte read")))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8-byte read")))
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(self.read_u64()? as i64)
    }

    pub(crate) fn read_hash(&mut self) -> Result<BlockHash, CodecError> {
        let bytes = self.read_bytes(HASH_SIZE)?;
        let mut arr = [0u8; HASH_SIZE];
        arr.copy_from_slice(bytes);
        Ok(BlockHash::new(arr))
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n - remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Asserts the record was fully consumed.
    pub(crate) fn finish(&self) -> Result<(), CodecError> {
        if self.pos != self.buf.len() {
            return Err(CodecError::TrailingBytes(self.buf.len() - self.pos));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(b: u8) -> BlockHash {
        BlockHash::new([b; 32])
    }

    fn validator(b: u8) -> ValidatorId {
        ValidatorId::new([b; 32])
    }

    fn sample_metadata() -> BlockMetadata {
        BlockMetadata::new(
            hash(3),
            vec![hash(1), hash(2)],
            vec![
                Justification::new(validator(b'A'), hash(1)),
                Justification::new(validator(b'B'), hash(2)),
            ],
            validator(b'A'),
            2,
            [validator(b'A'), validator(b'B')].into_iter().collect(),
        )
    }

    #[test]
    fn test_roundtrip() {
        let meta = sample_metadata();
        let bytes = meta.to_bytes();
        let decoded = BlockMetadata::from_bytes(&bytes).unwrap();
        assert_eq!(meta, decoded);
    }

    #[test]
    fn test_genesis_roundtrip() {
        let meta = BlockMetadata::new(
            hash(0),
            vec![],
            vec![],
            ValidatorId::empty(),
            0,
            BTreeSet::new(),
        );
        let bytes = meta.to_bytes();
        let decoded = BlockMetadata::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.validator, ValidatorId::empty());
        assert_eq!(decoded.rank, 0);
        assert!(decoded.parents.is_empty());
    }

    #[test]
    fn test_truncated_record_rejected() {
        let bytes = sample_metadata().to_bytes();
        for cut in [0, 1, 10, bytes.len() - 1] {
            assert!(
                BlockMetadata::from_bytes(&bytes[..cut]).is_err(),
                "cut at {cut} should fail"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_metadata().to_bytes();
        bytes.push(0xFF);
        assert!(matches!(
            BlockMetadata::from_bytes(&bytes),
            Err(CodecError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = sample_metadata().to_bytes();
        bytes[0] = 9;
        assert!(matches!(
            BlockMetadata::from_bytes(&bytes),
            Err(CodecError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_bad_validator_length_rejected() {
        let meta = BlockMetadata {
            validator: ValidatorId::from_bytes(vec![0x58; 16]),
            ..sample_metadata()
        };
        // The encoder writes whatever it is given; the decoder enforces the rule.
        let bytes = meta.to_bytes();
        assert!(matches!(
            BlockMetadata::from_bytes(&bytes),
            Err(CodecError::InvalidFieldLength {
                field: "validator",
                len: 16
            })
        ));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = sample_metadata().to_bytes();
        let b = sample_metadata().to_bytes();
        assert_eq!(a, b);
    }
}
