//! Ed25519 signature verification.
//!
//! The approval ceremony accepts detached Ed25519 signatures over the
//! Blake2b-256 digest of the candidate. Verification takes raw byte slices
//! and answers with a plain boolean: any malformed key or signature simply
//! fails to verify, the caller decides how to report it.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

/// Length of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Verify a detached signature.
///
/// Returns `false` for signatures that do not verify, and for inputs that
/// are not well-formed keys or signatures in the first place.
pub fn verify(pubkey: &[u8], message: &[u8], sig: &[u8]) -> bool {
    let Ok(pubkey): Result<[u8; PUBLIC_KEY_SIZE], _> = pubkey.try_into() else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&pubkey) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(sig) else {
        return false;
    };
    verifying_key.verify_strict(message, &signature).is_ok()
}

/// Sign a message with a raw 32-byte secret key.
///
/// The consensus core only verifies; this helper exists for tests and for
/// tooling that prepares ceremony approvals.
pub fn sign(secret: &[u8; 32], message: &[u8]) -> [u8; SIGNATURE_SIZE] {
    let signing_key = SigningKey::from_bytes(secret);
    signing_key.sign(message).to_bytes()
}

/// Derive the public key for a raw 32-byte secret key.
pub fn public_key(secret: &[u8; 32]) -> [u8; PUBLIC_KEY_SIZE] {
    SigningKey::from_bytes(secret).verifying_key().to_bytes()
}
