//! Gate configuration

use biogate_core::DEFAULT_ACTION_TTL_MINUTES;
use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Longest accepted action TTL (one week)
pub const MAX_ACTION_TTL_MINUTES: i64 = 7 * 24 * 60;

fn default_action_ttl_minutes() -> i64 {
    DEFAULT_ACTION_TTL_MINUTES
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Configuration for the action gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minutes from request to expiry
    #[serde(default = "default_action_ttl_minutes")]
    pub action_ttl_minutes: i64,

    /// Seconds between background expiry sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            action_ttl_minutes: default_action_ttl_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl GateConfig {
    /// Reject TTLs outside 1..=MAX_ACTION_TTL_MINUTES
    pub fn validate(&self) -> Result<(), GateError> {
        if !(1..=MAX_ACTION_TTL_MINUTES).contains(&self.action_ttl_minutes) {
            return Err(GateError::Validation(format!(
                "action_ttl_minutes must be between 1 and {}, got {}",
                MAX_ACTION_TTL_MINUTES, self.action_ttl_minutes
            )));
        }
        Ok(())
    }

    /// Configured TTL, clamped to the accepted range
    pub fn action_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.action_ttl_minutes.clamp(1, MAX_ACTION_TTL_MINUTES))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
