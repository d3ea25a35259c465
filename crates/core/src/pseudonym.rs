//! One-way pseudonyms for log correlation

use sha2::{Digest, Sha256};

/// Length of a pseudonym in hex characters
pub const PSEUDONYM_LEN: usize = 64;

/// Derive a deterministic, one-way pseudonym (hex SHA-256) from a natural identifier
pub fn pseudonymize(identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    hex::encode(hasher.finalize())
}
