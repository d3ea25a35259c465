//! Vault errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encryption,

    /// Tampered ciphertext, wrong key, or a payload that does not fit the
    /// recorded shape. Never recovered from.
    #[error("Decryption failed: {0}")]
    Decryption(String),
}
