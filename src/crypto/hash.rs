//! Hashing utilities
//!
//! SHA-256 and RIPEMD-160 helpers used for account address derivation.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// RIPEMD-160 of SHA-256 (20 bytes)
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));

    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd.finalize());
    out
}
