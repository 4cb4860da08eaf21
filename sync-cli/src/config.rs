//! Configuration loading for the tandem CLI.
//!
//! Configuration is loaded from a TOML file (default: `tandem.toml` in the
//! data directory). Every section and field is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tandem_sync_client::{PulseConfig, TimerConfig};
use tandem_sync_types::Role;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "tandem.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint configuration.
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Timer configuration.
    #[serde(default)]
    pub timer: TimerSection,
    /// Pulse output configuration.
    #[serde(default)]
    pub pulse: PulseSection,
}

/// Endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Which side of the pair this endpoint plays (default: companion).
    #[serde(default = "default_role")]
    pub role: Role,
}

/// Timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSection {
    /// Tick period in milliseconds (default: 10).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Pulse output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseSection {
    /// Gap between pulses in milliseconds (default: 500).
    #[serde(default = "default_spacing_ms")]
    pub spacing_ms: u64,
}

// Default value functions
fn default_role() -> Role {
    Role::Companion
}

fn default_tick_ms() -> u64 {
    10
}

fn default_spacing_ms() -> u64 {
    500
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
        }
    }
}

impl Default for TimerSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for PulseSection {
    fn default() -> Self {
        Self {
            spacing_ms: default_spacing_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the explicit config file, or `tandem.toml` from the data
    /// directory if present, or the defaults.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check values that would make the runtime misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.tick_ms == 0 {
            return Err(ConfigError::Invalid("timer.tick_ms must be positive".into()));
        }
        Ok(())
    }

    /// Timer settings for the engine.
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::default().with_tick(Duration::from_millis(self.timer.tick_ms))
    }

    /// Pulse settings for the sequencer.
    pub fn pulse_config(&self) -> PulseConfig {
        PulseConfig {
            spacing: Duration::from_millis(self.pulse.spacing_ms),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
