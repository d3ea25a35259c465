//! AES-256-GCM descriptor cipher
//!
//! Layout of a ciphertext:
//!
//! ```text
//! [version: 1 byte][nonce: 12 bytes][AES-GCM ciphertext + 16-byte tag]
//! ```
//!
//! The vector's shape and element type are bound as associated data, so a
//! ciphertext only opens under the metadata it was sealed with.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use biogate_core::{ElementType, FeatureVector};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use crate::error::VaultError;
use crate::kdf::KdfParams;

pub const CIPHERTEXT_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + NONCE_LEN;

/// Process-wide descriptor cipher, immutable after construction
pub struct DescriptorCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for DescriptorCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DescriptorCipher { key: <redacted> }")
    }
}

/// Associated data binding a ciphertext to its decoding metadata
fn associated_data(shape: &[usize], element_type: ElementType) -> Vec<u8> {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("{}:{}", element_type, dims.join("x")).into_bytes()
}

impl DescriptorCipher {
    /// Derive the key from a configured secret
    pub fn derive(secret: &str, params: &KdfParams) -> Result<Self, VaultError> {
        if params.uses_builtin_salt() {
            warn!("descriptor key derived with the built-in salt; configure kdf.salt per deployment");
        }
        let key = params.derive_key(secret)?;
        Self::from_key(&key)
    }

    /// Build from raw key bytes (32 bytes)
    pub fn from_key(key: &[u8]) -> Result<Self, VaultError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| VaultError::KeyDerivation(format!("key must be 32 bytes, got {}", key.len())))?;
        Ok(Self { cipher })
    }

    /// Encrypt a feature vector into a self-contained ciphertext
    pub fn encrypt(&self, vector: &FeatureVector) -> Result<Vec<u8>, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = vector.to_le_bytes();
        let aad = associated_data(vector.shape(), vector.element_type());
        let sealed = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: &plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| VaultError::Encryption)?;

        let mut out = Vec::with_capacity(HEADER_LEN + sealed.len());
        out.push(CIPHERTEXT_VERSION);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a ciphertext back into a vector of the given shape and element type
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        shape: &[usize],
        element_type: ElementType,
    ) -> Result<FeatureVector, VaultError> {
        if ciphertext.len() < HEADER_LEN + TAG_LEN {
            return Err(VaultError::Decryption(format!(
                "ciphertext truncated ({} bytes)",
                ciphertext.len()
            )));
        }
        if ciphertext[0] != CIPHERTEXT_VERSION {
            return Err(VaultError::Decryption(format!(
                "unsupported ciphertext version {}",
                ciphertext[0]
            )));
        }

        let nonce = Nonce::from_slice(&ciphertext[1..HEADER_LEN]);
        let aad = associated_data(shape, element_type);
        let plaintext = self
            .cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &ciphertext[HEADER_LEN..],
                    aad: &aad,
                },
            )
            .map_err(|_| {
                VaultError::Decryption("authentication failed (tampered data, wrong key or metadata)".to_string())
            })?;

        FeatureVector::from_le_bytes(&plaintext, shape, element_type)
            .map_err(|e| VaultError::Decryption(e.to_string()))
    }
}
