//! Rig configuration.
//!
//! Loaded from YAML; every key is optional.
//!
//! ```yaml
//! variant: three_arm
//! probe_timeout_ms: 2000
//! stats_timeout_ms: 1500
//! schema_fingerprint: "3f5a..."
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use valvelink_messenger::BAUD_RATE;

use crate::error::ConfigError;
use crate::types::DeviceVariant;

/// Configuration for one rig session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RigConfig {
    /// Firmware variant expected on the link.
    pub variant: DeviceVariant,
    /// Overrides the variant's identity string.
    pub identity: Option<String>,
    /// How long to wait for `probe_result`.
    pub probe_timeout_ms: u64,
    /// How long to wait for `stats`.
    pub stats_timeout_ms: u64,
    /// Pause between transport reads while waiting.
    pub poll_interval_ms: u64,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Expected command table fingerprint, if pinned.
    pub schema_fingerprint: Option<String>,
}

impl Default for RigConfig {
    fn default() -> Self {
        RigConfig {
            variant: DeviceVariant::Normal,
            identity: None,
            probe_timeout_ms: 1000,
            stats_timeout_ms: 1000,
            poll_interval_ms: 5,
            baud_rate: BAUD_RATE,
            schema_fingerprint: None,
        }
    }
}

impl RigConfig {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if text.trim().is_empty() {
            return Ok(RigConfig::default());
        }
        let config: RigConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidValue(
                "baud_rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Identity string `probe_result` must carry.
    pub fn identity(&self) -> &str {
        self.identity
            .as_deref()
            .unwrap_or_else(|| self.variant.identity())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn stats_timeout(&self) -> Duration {
        Duration::from_millis(self.stats_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RigConfig::default();
        assert_eq!(config.identity(), "water_system_normal");
        assert_eq!(config.probe_timeout(), Duration::from_secs(1));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(RigConfig::from_yaml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_yaml() {
        let config = RigConfig::from_yaml_str("variant: three_arm\nstats_timeout_ms: 250\n").unwrap();
        assert_eq!(config.variant, DeviceVariant::ThreeArm);
        assert_eq!(config.identity(), "three_arm_water_system");
        assert_eq!(config.stats_timeout(), Duration::from_millis(250));
        assert_eq!(config.probe_timeout_ms, 1000);
    }

    #[test]
    fn test_identity_override() {
        let config = RigConfig::from_yaml_str("identity: bench_rig\n").unwrap();
        assert_eq!(config.identity(), "bench_rig");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            RigConfig::from_yaml_str("probe_timeout: 5\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(matches!(
            RigConfig::from_yaml_str("poll_interval_ms: 0\n"),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
