//! Application context - wires everything together

use std::path::{Path, PathBuf};
use std::sync::Arc;

use biogate_audit::AuditRecorder;
use biogate_biometric::{BiometricVerifier, CapabilityRegistry, FeatureExtractor, PrecomputedExtractor};
use biogate_gate::ActionGate;
use biogate_store::Store;
use biogate_vault::DescriptorCipher;
use tracing::info;

use crate::config::{AppConfig, ENCRYPTION_KEY_ENV};
use crate::registry::PrincipalRegistry;

/// Application context - wires together all components
pub struct AppContext {
    pub store: Arc<Store>,
    pub principals: PrincipalRegistry,
    pub verifier: Arc<BiometricVerifier>,
    pub gate: Arc<ActionGate>,
    pub audit: AuditRecorder,
    config: AppConfig,
    database_path: PathBuf,
}

impl AppContext {
    /// Create a context over `data_path` using pre-extracted samples
    pub fn new(data_path: impl AsRef<Path>, config: AppConfig) -> Result<Self, anyhow::Error> {
        Self::with_extractor(data_path, config, Arc::new(PrecomputedExtractor::new()))
    }

    /// Create a context with a custom feature extractor
    pub fn with_extractor(
        data_path: impl AsRef<Path>,
        config: AppConfig,
        extractor: Arc<dyn FeatureExtractor>,
    ) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        std::fs::create_dir_all(data_path)?;

        let Some(secret) = config.encryption_key.as_deref() else {
            anyhow::bail!(
                "No encryption key configured (set {} or encryption_key in the config file)",
                ENCRYPTION_KEY_ENV
            );
        };

        config.gate.validate()?;

        // Derived once; immutable for the life of the process
        let cipher = Arc::new(DescriptorCipher::derive(secret, &config.kdf)?);

        let database_path = config.database_path_in(data_path);
        let store = Arc::new(Store::open(&database_path)?);

        let capabilities = CapabilityRegistry::standard(extractor, &config.verifier);
        let verifier = Arc::new(BiometricVerifier::new(store.clone(), cipher, capabilities));
        let gate = Arc::new(ActionGate::new(store.clone(), verifier.clone(), config.gate.clone()));

        info!(database = %database_path.display(), "biogate context ready");

        Ok(Self {
            principals: PrincipalRegistry::new(store.clone()),
            audit: AuditRecorder::new(store.clone()),
            store,
            verifier,
            gate,
            config,
            database_path,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}
