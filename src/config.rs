use crate::telegrams::TemperatureLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_LIVENESS_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
const DEFAULT_SMOOTHING_TOLERANCE: f32 = 0.2;
const DEFAULT_REQUEST_RETRY_MS: u64 = 30_000;
const DEFAULT_REFRESH_INTERVAL_MS: u64 = 300_000; // 5 minutes

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub liveness_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub temperature_limits: TemperatureLimits,
    pub smoothing_enabled: bool,
    pub smoothing_tolerance: f32,
    pub request_retry_ms: Option<u64>,
    pub refresh_interval_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: DEFAULT_LIVENESS_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            temperature_limits: TemperatureLimits::default(),
            smoothing_enabled: true,
            smoothing_tolerance: DEFAULT_SMOOTHING_TOLERANCE,
            request_retry_ms: Some(DEFAULT_REQUEST_RETRY_MS),
            refresh_interval_ms: Some(DEFAULT_REFRESH_INTERVAL_MS),
        }
    }
}

impl EngineConfig {
    /// Loads a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.liveness_timeout_ms == 0 {
            return Err(ConfigError::Invalid("liveness_timeout_ms must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive"));
        }
        let limits = &self.temperature_limits;
        if !limits.celsius.is_ordered() {
            return Err(ConfigError::Invalid("celsius limits must satisfy min < max"));
        }
        if !limits.fahrenheit.is_ordered() {
            return Err(ConfigError::Invalid("fahrenheit limits must satisfy min < max"));
        }
        if !(self.smoothing_tolerance > 0.0 && self.smoothing_tolerance < 1.0) {
            return Err(ConfigError::Invalid("smoothing_tolerance must lie strictly between 0 and 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.liveness_timeout_ms, 10_000);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{"liveness_timeout_ms": 5000, "refresh_interval_ms": null}"#).unwrap();
        assert_eq!(config.liveness_timeout_ms, 5000);
        assert_eq!(config.refresh_interval_ms, None);
        assert_eq!(config.request_retry_ms, Some(30_000));
        assert!(config.smoothing_enabled);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"smoothing_tolerance": 1.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"temperature_limits": {"celsius": {"min": 40, "max": 7}, "fahrenheit": {"min": 7, "max": 40}}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
