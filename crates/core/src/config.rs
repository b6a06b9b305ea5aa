//! Client configuration
//!
//! Loaded from `client.toml` in the per-user config directory. Every field is
//! optional:
//!
//! ```toml
//! channel = "default"
//! connect_timeout_ms = 3000
//! recoverable_backoff_ms = 50
//! join_timeout_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::{ChannelName, DEFAULT_CHANNEL};
use crate::error::ConfigError;

/// File name looked up by [`ClientConfig::load_default`]
pub const CONFIG_FILE_NAME: &str = "client.toml";

/// Default time `connect` waits for the worker to accept
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Settings for a pipe client connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Channel suffix (namespace prefix is added automatically)
    pub channel: String,
    /// How long `connect` waits for the worker to accept
    pub connect_timeout_ms: u64,
    /// Minimum delay after a malformed frame before reading again
    pub recoverable_backoff_ms: u64,
    /// How long `disconnect` waits for the inbound loop before aborting it
    pub join_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            recoverable_backoff_ms: 50,
            join_timeout_ms: 1000,
        }
    }
}

impl ClientConfig {
    /// Parse configuration from TOML content
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `client.toml` from the user config directory, or defaults if absent
    pub fn load_default() -> Result<Self, ConfigError> {
        let Some(path) = Self::default_path() else {
            debug!("No config directory available, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load(&path)
    }

    /// Path of the per-user config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "onyx", "cefpipe").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.recoverable_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "recoverable_backoff_ms must be greater than zero".into(),
            ));
        }
        if self.channel.is_empty() {
            return Err(ConfigError::Invalid("channel must not be empty".into()));
        }
        Ok(())
    }

    pub fn channel_name(&self) -> ChannelName {
        ChannelName::new(self.channel.as_str())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn recoverable_backoff(&self) -> Duration {
        Duration::from_millis(self.recoverable_backoff_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
