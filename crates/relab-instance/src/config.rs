//! Elaboration configuration
//!
//! Defaults for timer and action timing live here instead of in global state,
//! so every elaboration session states them explicitly.

use relab_ast::TimeValue;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one elaboration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElaborationConfig {
    /// Offset used when a timer gives none
    #[serde(deserialize_with = "time_value")]
    pub default_offset: TimeValue,
    /// Period used when a timer gives none; zero means fire once
    #[serde(deserialize_with = "time_value")]
    pub default_period: TimeValue,
    /// Name of the implicit startup trigger added to every instance
    pub startup_name: String,
    /// Maximum containment depth below the root
    pub max_depth: usize,
}

impl Default for ElaborationConfig {
    fn default() -> Self {
        Self {
            default_offset: TimeValue::ZERO,
            default_period: TimeValue::ZERO,
            startup_name: "startup".to_string(),
            max_depth: 256,
        }
    }
}

impl ElaborationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_offset(mut self, offset: TimeValue) -> Self {
        self.default_offset = offset;
        self
    }

    pub fn with_default_period(mut self, period: TimeValue) -> Self {
        self.default_period = period;
        self
    }

    pub fn with_startup_name(mut self, name: impl Into<String>) -> Self {
        self.startup_name = name.into();
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ElaborationConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.startup_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "startup_name must not be empty".to_string(),
            ));
        }
        if self.default_offset.to_nanos() < 0 || self.default_period.to_nanos() < 0 {
            return Err(ConfigError::Invalid(
                "default timing values must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accept either `"10 ms"` or `{ magnitude = 10, unit = "msec" }`
fn time_value<'de, D>(deserializer: D) -> Result<TimeValue, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TimeSpec {
        Text(String),
        Value(TimeValue),
    }

    match TimeSpec::deserialize(deserializer)? {
        TimeSpec::Text(text) => text.parse().map_err(serde::de::Error::custom),
        TimeSpec::Value(value) => Ok(value),
    }
}
