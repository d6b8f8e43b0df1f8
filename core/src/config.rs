//! Persistent settings for the command wrappers.
//!
//! Stored as JSON at `~/.wincmd/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::PortRange;
use crate::error::{Error, Result};

/// Configuration data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Seconds an external command may run before it is killed.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Range searched by the free-port helpers.
    #[serde(default)]
    pub port_range: PortRange,
}

fn default_command_timeout() -> u64 {
    30
}

impl Config {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            port_range: PortRange::default(),
        }
    }
}

/// Reads and writes [`Config`].
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a config store at `~/.wincmd/config.json`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".wincmd").join("config.json"),
        })
    }

    /// Create a config store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns the default config if the file doesn't exist.
    pub async fn load(&self) -> Result<Config> {
        if !fs::try_exists(&self.config_path).await? {
            debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        if config.command_timeout_secs == 0 {
            return Err(Error::Config(
                "commandTimeoutSecs must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// Save configuration to disk, creating the directory if needed.
    pub async fn save(&self, config: &Config) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            fs::create_dir_all(config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write to a temp file, then rename over the target.
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        debug!(path = %self.config_path.display(), "Saved config");
        Ok(())
    }

    pub async fn get_command_timeout(&self) -> Result<Duration> {
        Ok(self.load().await?.command_timeout())
    }

    /// Set the command timeout in whole seconds. Zero is rejected.
    pub async fn set_command_timeout(&self, seconds: u64) -> Result<()> {
        if seconds == 0 {
            return Err(Error::Config(
                "command timeout must be greater than zero".to_string(),
            ));
        }
        let mut config = self.load().await?;
        config.command_timeout_secs = seconds;
        self.save(&config).await
    }

    pub async fn get_port_range(&self) -> Result<PortRange> {
        Ok(self.load().await?.port_range)
    }

    pub async fn set_port_range(&self, range: PortRange) -> Result<()> {
        let mut config = self.load().await?;
        config.port_range = range;
        self.save(&config).await
    }
}
