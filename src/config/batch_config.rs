// src/config/batch_config.rs

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of worker threads (default: all available cores)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,

    /// Capacity of the collision channel between an engine and dedup
    pub channel_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            threads: None, // use every core
            log_level: "info".to_string(),
            channel_capacity: 256,
        }
    }
}

impl BatchConfig {
    /// Load configuration with precedence: config file → env vars → defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("batchgcd.toml")
    }

    /// Load configuration with custom file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default("channel_capacity", 256)?;

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        // Override with environment variables (prefix: BATCHGCD_)
        builder = builder.add_source(Environment::with_prefix("BATCHGCD").try_parsing(true));

        let config = builder.build()?;
        config.try_deserialize()
    }
}
