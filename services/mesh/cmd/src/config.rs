//! Configuration handling for the tlvf tool.
//!
//! Settings come from an optional YAML file, then environment variables,
//! then command line flags (applied by the caller).

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use mesh_tlvf::{DEFAULT_MESSAGE_CAPACITY, MAX_TLV_PAYLOAD};

/// How decoded messages are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per TLV followed by its fields
    Text,
    /// A JSON array of TLV summaries
    Json,
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Buffer size used when building sample records
    pub default_capacity: usize,
    /// Largest input accepted by `decode`
    pub max_message_size: usize,
    /// Log level when `--log-level` is not given
    pub log_level: String,
    /// Output format when `--json` is not given
    pub output: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_MESSAGE_CAPACITY,
            max_message_size: MAX_TLV_PAYLOAD,
            log_level: "info".to_string(),
            output: OutputFormat::Text,
        }
    }
}

impl CliConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<CliConfig>(&content) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(err) => {
                    warn!("Failed to parse config file {:?}, using defaults: {}", path, err);
                    Self::default()
                }
            },
            Err(_) => {
                debug!("Config file {:?} not found, using defaults", path);
                Self::default()
            }
        };

        config.apply_environment_overrides();
        config.validate()?;

        debug!(
            "Final configuration: default_capacity={}, max_message_size={}, log_level={}, output={:?}",
            config.default_capacity, config.max_message_size, config.log_level, config.output
        );
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_environment_overrides(&mut self) {
        if let Ok(value) = std::env::var("TLVF_DEFAULT_CAPACITY") {
            match value.parse::<usize>() {
                Ok(capacity) => {
                    self.default_capacity = capacity;
                    info!("Default capacity overridden by environment: {}", capacity);
                }
                Err(_) => warn!("Ignoring invalid TLVF_DEFAULT_CAPACITY: {}", value),
            }
        }

        if let Ok(value) = std::env::var("TLVF_MAX_MESSAGE_SIZE") {
            match value.parse::<usize>() {
                Ok(size) => {
                    self.max_message_size = size;
                    info!("Max message size overridden by environment: {}", size);
                }
                Err(_) => warn!("Ignoring invalid TLVF_MAX_MESSAGE_SIZE: {}", value),
            }
        }

        if let Ok(level) = std::env::var("TLVF_LOG_LEVEL") {
            info!("Log level overridden by environment: {}", level);
            self.log_level = level;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default_capacity == 0 {
            bail!("default_capacity must be greater than zero");
        }
        if self.max_message_size == 0 {
            bail!("max_message_size must be greater than zero");
        }
        Ok(())
    }
}
