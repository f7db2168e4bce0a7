//! Configuration management for haprobe.
//!
//! Configuration is loaded from `~/.config/haprobe/config.toml`. The client
//! section is handed to every query explicitly; nothing here is global.

use crate::protocol::{ReadMode, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_RESPONSE_BYTES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-query client settings.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Settings threaded into each exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deadline for each of connect, write and read, in milliseconds. 0 disables it.
    #[serde(default)]
    pub timeout_ms: u64,
    /// Read buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: NonZeroUsize,
    /// Single read, or read until the peer closes.
    #[serde(default)]
    pub read_mode: ReadMode,
    /// Largest reply accepted in `to-end` mode.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: NonZeroUsize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            buffer_size: default_buffer_size(),
            read_mode: ReadMode::default(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

fn default_buffer_size() -> NonZeroUsize {
    DEFAULT_BUFFER_SIZE
}

fn default_max_response_bytes() -> NonZeroUsize {
    DEFAULT_MAX_RESPONSE_BYTES
}

impl ClientConfig {
    /// Per-phase deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("haprobe"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, using defaults if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, using defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
