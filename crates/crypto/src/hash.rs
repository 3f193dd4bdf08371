//! Blake2b-256 hashing.
//!
//! Block hashes and the genesis candidate digest are Blake2b with a 32-byte
//! output. A streaming [`Hasher`] is provided for callers that assemble the
//! input in pieces.

/// Output size of all Arbor digests.
pub const DIGEST_SIZE: usize = 32;

/// Compute the Blake2b-256 digest of the input data.
///
/// # Example
///
/// ```rust
/// use arbor_crypto::blake2b256;
///
/// let digest = blake2b256(b"hello");
/// assert_eq!(digest.len(), 32);
/// ```
#[inline]
pub fn blake2b256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let hash = blake2b_simd::Params::new()
        .hash_length(DIGEST_SIZE)
        .hash(data);
    let mut out = [0u8; DIGEST_SIZE];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// A streaming Blake2b-256 hasher for incremental input.
///
/// # Example
///
/// ```rust
/// use arbor_crypto::Hasher;
///
/// let mut hasher = Hasher::new();
/// hasher.update(b"hello ");
/// hasher.update(b"world");
/// let digest = hasher.finalize();
/// ```
#[derive(Clone)]
pub struct Hasher {
    state: blake2b_simd::State,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self {
            state: blake2b_simd::Params::new()
                .hash_length(DIGEST_SIZE)
                .to_state(),
        }
    }

    /// Feed more input.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> [u8; DIGEST_SIZE] {
        let mut out = [0u8; DIGEST_SIZE];
        out.copy_from_slice(self.state.finalize().as_bytes());
        out
    }
}

impl std::fmt::Debug for Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hasher").finish_non_exhaustive()
    }
}
