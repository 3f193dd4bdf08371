//! Validator identifiers.
//!
//! A [`ValidatorId`] is a 32-byte Ed25519 public key. The empty identifier is
//! reserved for the genesis block, which has no author; the 0-or-32 length
//! rule is enforced at the DAG store boundary when a block is inserted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Length of a non-empty validator identifier in bytes.
pub const VALIDATOR_ID_SIZE: usize = 32;

/// A validator public key, or the empty identifier for the genesis block.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ValidatorId(Vec<u8>);

impl ValidatorId {
    /// The empty identifier, valid only as the author of the genesis block.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Creates a validator id from a 32-byte public key.
    pub fn new(bytes: [u8; VALIDATOR_ID_SIZE]) -> Self {
        Self(bytes.to_vec())
    }

    /// Creates a validator id from raw bytes without checking the length.
    ///
    /// The DAG store rejects any non-empty id that is not exactly 32 bytes,
    /// so this constructor is the entry point for untrusted input.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes of the identifier.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true for the empty (genesis) identifier.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the length of the identifier in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the identifier satisfies the 0-or-32 length rule.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.0.is_empty() || self.0.len() == VALIDATOR_ID_SIZE
    }

    /// Returns the identifier as a fixed 32-byte array, if non-empty and
    /// well formed.
    pub fn as_public_key(&self) -> Option<[u8; VALIDATOR_ID_SIZE]> {
        <[u8; VALIDATOR_ID_SIZE]>::try_from(self.0.as_slice()).ok()
    }
}

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "ValidatorId(empty)")
        } else {
            write!(f, "ValidatorId(0x{}..)", hex::encode(&self.0[..4.min(self.0.len())]))
        }
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl From<[u8; VALIDATOR_ID_SIZE]> for ValidatorId {
    fn from(bytes: [u8; VALIDATOR_ID_SIZE]) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for ValidatorId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ValidatorId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for ValidatorId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_well_formed() {
        let id = ValidatorId::empty();
        assert!(id.is_empty());
        assert!(id.is_well_formed());
        assert_eq!(id.as_public_key(), None);
    }

    #[test]
    fn test_full_key_is_well_formed() {
        let id = ValidatorId::new([0x41; 32]);
        assert!(!id.is_empty());
        assert!(id.is_well_formed());
        assert_eq!(id.as_public_key(), Some([0x41; 32]));
    }

    #[test]
    fn test_truncated_key_is_malformed() {
        let id = ValidatorId::from_bytes(vec![0x58; 16]);
        assert!(!id.is_well_formed());
        assert_eq!(id.len(), 16);
    }

    #[test]
    fn test_serde_roundtrip() {
        let id = ValidatorId::new([0x07; 32]);
        let json = serde_json::to_string(&id).unwrap();
        let back: ValidatorId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
