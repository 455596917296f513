//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 / RIPEMD-160 hashing
//! - secp256k1 key pairs and address derivation

pub mod hash;
pub mod keys;

pub use hash::{hash160, sha256};
pub use keys::{public_key_to_address, KeyError, KeyPair};
