//! Runtime configuration, loaded once at process start.

use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

const fn default_lease_secs() -> u64 {
    60
}

fn default_queue_collection() -> String {
    "mail".to_string()
}

/// Top-level configuration for the queue processor, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default sender applied when a document carries no `from`.
    #[serde(default)]
    pub default_from: Option<String>,

    /// Default reply-to applied when a document carries no `replyTo`.
    #[serde(default)]
    pub default_reply_to: Option<String>,

    /// Name of the watched mail-queue collection.
    #[serde(default = "default_queue_collection")]
    pub queue_collection: String,

    /// Users collection backing uid-based recipient lookups.
    ///
    /// Omit when uid addressing is not in use; documents that request it
    /// anyway fail validation.
    #[serde(default)]
    pub users_collection: Option<String>,

    /// Templates collection backing template rendering.
    #[serde(default)]
    pub templates_collection: Option<String>,

    /// How long a delivery attempt owns its document before the lease is
    /// considered expired.
    ///
    /// Default: 60 seconds
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Retention window for terminal documents, in seconds.
    ///
    /// Documents in SUCCESS or ERROR older than this are swept from the
    /// collection. Omit to keep them forever.
    #[serde(default)]
    pub retention_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_from: None,
            default_reply_to: None,
            queue_collection: default_queue_collection(),
            users_collection: None,
            templates_collection: None,
            lease_secs: default_lease_secs(),
            retention_secs: None,
        }
    }
}

impl Config {
    /// Parse a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// The processing lease window.
    #[must_use]
    pub const fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    /// The retention window for terminal documents, if configured.
    #[must_use]
    pub fn retention(&self) -> Option<Duration> {
        self.retention_secs.map(Duration::from_secs)
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
