//! Loader configuration file support
//!
//! Handles parsing of `.bulk-loader.toml` configuration files and
//! environment variable overrides. The defaults match what the SDK has
//! always shipped with: one batch per load, 200 seconds for direct
//! inserts, 660 seconds for staging loads, 300 seconds for statement
//! batches.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".bulk-loader.toml";

/// Environment variable for batch size
pub const ENV_BATCH_SIZE: &str = "BULK_LOADER_BATCH_SIZE";

/// Environment variable for the direct-insert timeout (seconds)
pub const ENV_INSERT_TIMEOUT: &str = "BULK_LOADER_INSERT_TIMEOUT";

/// Environment variable for the staging-load timeout (seconds)
pub const ENV_STAGING_LOAD_TIMEOUT: &str = "BULK_LOADER_STAGING_LOAD_TIMEOUT";

/// Environment variable for the statement timeout (seconds)
pub const ENV_STATEMENT_TIMEOUT: &str = "BULK_LOADER_STATEMENT_TIMEOUT";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    #[error("Config IO error: {0}")]
    Io(String),

    /// Failed to parse the configuration file
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Failed to serialize the configuration
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Load configuration section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoadSection {
    /// Rows per bulk-transfer batch; unset sends all rows in one batch
    #[serde(default)]
    pub batch_size: Option<usize>,
}

/// Timeout configuration section
///
/// All values are server-side timeouts in seconds; the SDK sets no
/// client-side deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsSection {
    /// Timeout for direct bulk inserts
    #[serde(default = "default_insert_secs")]
    pub insert_secs: u32,

    /// Timeout for bulk loads into staging tables
    #[serde(default = "default_staging_load_secs")]
    pub staging_load_secs: u32,

    /// Timeout for individual statements and statement batches
    #[serde(default = "default_statement_secs")]
    pub statement_secs: u32,
}

fn default_insert_secs() -> u32 {
    200
}

fn default_staging_load_secs() -> u32 {
    660
}

fn default_statement_secs() -> u32 {
    300
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            insert_secs: default_insert_secs(),
            staging_load_secs: default_staging_load_secs(),
            statement_secs: default_statement_secs(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.bulk-loader.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoaderConfig {
    /// Load configuration
    #[serde(default)]
    pub load: LoadSection,

    /// Timeout configuration
    #[serde(default)]
    pub timeouts: TimeoutsSection,
}

impl LoaderConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with an explicit batch size
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            load: LoadSection {
                batch_size: Some(batch_size),
            },
            ..Default::default()
        }
    }

    /// Load configuration from a directory
    ///
    /// Looks for `.bulk-loader.toml` in the directory and falls back to
    /// defaults when it is not there. Environment variables override
    /// whatever was loaded.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let config_path = dir.join(CONFIG_FILENAME);
        let content = self.to_toml()?;

        std::fs::write(&config_path, content)
            .map_err(|e| ConfigError::Io(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var(ENV_BATCH_SIZE)
            && let Ok(size) = size.parse()
        {
            self.load.batch_size = Some(size);
        }

        if let Ok(secs) = std::env::var(ENV_INSERT_TIMEOUT)
            && let Ok(secs) = secs.parse()
        {
            self.timeouts.insert_secs = secs;
        }

        if let Ok(secs) = std::env::var(ENV_STAGING_LOAD_TIMEOUT)
            && let Ok(secs) = secs.parse()
        {
            self.timeouts.staging_load_secs = secs;
        }

        if let Ok(secs) = std::env::var(ENV_STATEMENT_TIMEOUT)
            && let Ok(secs) = secs.parse()
        {
            self.timeouts.statement_secs = secs;
        }
    }

    /// Check if a configuration file exists in a directory
    pub fn exists(dir: &Path) -> bool {
        dir.join(CONFIG_FILENAME).exists()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Bulk Loading SDK Configuration

[load]
# Rows per bulk-transfer batch. Leave unset to send all rows in one batch.
# batch_size = 5000

[timeouts]
# Server-side timeouts, in seconds.
insert_secs = 200
staging_load_secs = 660
statement_secs = 300
"#
}
