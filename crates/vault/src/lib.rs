//! BioGate Vault - Encrypted Descriptor Store
//!
//! Biometric feature vectors are encrypted with AES-256-GCM under a key
//! derived once at startup (PBKDF2-HMAC-SHA256). Ciphertexts are
//! self-contained: only the vector's shape and element type travel
//! separately, and those are not secret.

pub mod cipher;
pub mod error;
pub mod kdf;

pub use cipher::{DescriptorCipher, CIPHERTEXT_VERSION};
pub use error::VaultError;
pub use kdf::{KdfParams, DEFAULT_KDF_ITERATIONS, DEFAULT_KDF_SALT};
