//! Key derivation parameters

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::VaultError;

/// Built-in salt. Shared by every deployment that does not override it,
/// so two deployments with the same secret derive the same key.
pub const DEFAULT_KDF_SALT: &str = "biometric-cicd-salt";

pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

/// Length of the derived AES-256 key
pub const KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_salt")]
    pub salt: String,

    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_salt() -> String {
    DEFAULT_KDF_SALT.to_string()
}

fn default_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            salt: default_salt(),
            iterations: default_iterations(),
        }
    }
}

impl KdfParams {
    pub fn uses_builtin_salt(&self) -> bool {
        self.salt == DEFAULT_KDF_SALT
    }

    /// Derive the symmetric key from a configured secret
    pub fn derive_key(&self, secret: &str) -> Result<[u8; KEY_LEN], VaultError> {
        if secret.is_empty() {
            return Err(VaultError::KeyDerivation("secret is empty".to_string()));
        }
        if self.iterations == 0 {
            return Err(VaultError::KeyDerivation(
                "iteration count must be positive".to_string(),
            ));
        }

        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), self.salt.as_bytes(), self.iterations, &mut key);
        Ok(key)
    }
}
