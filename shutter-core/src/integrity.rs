//! Integrity: per-frame SHA-256 digest, verified on demand.

use sha2::{Digest, Sha256};

/// Width of a frame checksum on the wire.
pub const DIGEST_LEN: usize = 32;

/// Hash a frame payload. Returns 32-byte digest.
pub fn hash_chunk(payload: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

/// Verify frame payload against expected hash.
pub fn verify_chunk(payload: &[u8], expected_hash: &[u8; DIGEST_LEN]) -> bool {
    hash_chunk(payload) == *expected_hash
}
