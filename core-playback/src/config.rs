//! # Playback Configuration
//!
//! Controller settings derived from the runtime's [`PlaybackSettings`].

use core_runtime::config::{PlaybackSettings, DEFAULT_METADATA_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Session volume before any user change.
    ///
    /// Default: 1.0.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Maximum wait for a freshly opened handle to report its metadata.
    /// Expiry fails the load with a decode error.
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            metadata_timeout: default_metadata_timeout(),
        }
    }
}

impl PlaybackConfig {
    pub fn with_initial_volume(mut self, volume: f32) -> Self {
        self.initial_volume = volume;
        self
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaybackError::Config(format!(
                "initial_volume must be between 0.0 and 1.0, got {}",
                self.initial_volume
            )));
        }

        if self.metadata_timeout.is_zero() {
            return Err(PlaybackError::Config(
                "metadata_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl From<&PlaybackSettings> for PlaybackConfig {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            initial_volume: settings.initial_volume,
            metadata_timeout: settings.metadata_timeout(),
        }
    }
}

fn default_initial_volume() -> f32 {
    1.0
}

fn default_metadata_timeout() -> Duration {
    Duration::from_millis(DEFAULT_METADATA_TIMEOUT_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PlaybackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_volume, 1.0);
        assert_eq!(config.metadata_timeout, Duration::from_secs(15));
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(PlaybackConfig::default()
            .with_initial_volume(-0.1)
            .validate()
            .is_err());
        assert!(PlaybackConfig::default()
            .with_metadata_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn from_runtime_settings() {
        let settings = PlaybackSettings {
            initial_volume: 0.25,
            metadata_timeout_ms: 500,
            ..PlaybackSettings::default()
        };
        let config = PlaybackConfig::from(&settings);
        assert_eq!(config.initial_volume, 0.25);
        assert_eq!(config.metadata_timeout, Duration::from_millis(500));
    }

    #[test]
    fn serde_fills_defaults() {
        let config: PlaybackConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PlaybackConfig::default());
    }
}
