//! Application configuration
//!
//! Loaded from an optional JSON file; every field has a default except the
//! encryption secret, which usually comes from `BIOGATE_ENCRYPTION_KEY`.

use std::path::{Path, PathBuf};

use biogate_biometric::VerifierConfig;
use biogate_gate::GateConfig;
use biogate_vault::KdfParams;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `encryption_key`
pub const ENCRYPTION_KEY_ENV: &str = "BIOGATE_ENCRYPTION_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file, relative paths resolve under the data directory
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// tracing level: error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Secret the descriptor key is derived from
    #[serde(default, skip_serializing)]
    pub encryption_key: Option<String>,

    #[serde(default)]
    pub kdf: KdfParams,

    #[serde(default)]
    pub verifier: VerifierConfig,

    #[serde(default)]
    pub gate: GateConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("biogate.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            encryption_key: None,
            kdf: KdfParams::default(),
            verifier: VerifierConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config
            .gate
            .validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// File (if given) or defaults, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, std::io::Error> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_encryption_key_override(std::env::var(ENCRYPTION_KEY_ENV).ok()))
    }

    /// A non-empty override replaces the configured secret
    pub fn with_encryption_key_override(mut self, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.encryption_key = Some(value);
        }
        self
    }

    /// Database location for a data directory
    pub fn database_path_in(&self, data_dir: &Path) -> PathBuf {
        if self.database_path.is_absolute() {
            self.database_path.clone()
        } else {
            data_dir.join(&self.database_path)
        }
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
