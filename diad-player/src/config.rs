//! Configuration for the diad player
//!
//! Settings sources priority:
//!
//! 1. Command-line arguments (`--data-folder`, `--device`, ...)
//! 2. Environment variables (`DIAD_DATA_FOLDER`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! Every TOML field is optional; missing fields use built-in defaults.

use crate::audio::DEFAULT_SAMPLE_RATE;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Folder holding `levels.json` and `samples/`
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    /// Audio player settings
    #[serde(default)]
    pub player: PlayerConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Audio player settings (`[player]` table)
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Preferred output sample rate; the device may override it
    pub sample_rate: u32,

    /// Maximum sample decodes in flight per playback session
    pub decode_concurrency: usize,

    /// Output device name (None = default device)
    pub device_name: Option<String>,

    /// Output buffer size in frames (None = device default)
    pub buffer_size: Option<u32>,

    /// Event bus capacity per subscriber
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            decode_concurrency: 4,
            device_name: None,
            buffer_size: None,
            event_capacity: 100,
        }
    }
}

impl PlayerConfig {
    /// Replace out-of-range values with defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.sample_rate == 0 {
            warn!("Invalid sample_rate 0, using default {}", defaults.sample_rate);
            self.sample_rate = defaults.sample_rate;
        }
        if self.decode_concurrency == 0 {
            warn!(
                "Invalid decode_concurrency 0, using default {}",
                defaults.decode_concurrency
            );
            self.decode_concurrency = defaults.decode_concurrency;
        }
        if self.event_capacity == 0 {
            warn!(
                "Invalid event_capacity 0, using default {}",
                defaults.event_capacity
            );
            self.event_capacity = defaults.event_capacity;
        }
        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "diad=info,diad_player=debug,diad_common=info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid TOML in {}: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(Self {
            player: config.player.validated(),
            ..config
        })
    }

    /// Load `explicit` if given (it must exist), otherwise the platform
    /// config file, otherwise built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match diad_common::config::find_config_file() {
            Ok(path) => Self::load(&path),
            Err(_) => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}
