//! Configuration module for mocap-rs
//!
//! This module handles the persisted configuration of the command-line tool:
//! - Codec defaults used when writing files (byte order, storage format, flags)
//! - Logging filter and optional log file
//!
//! # Config Location
//!
//! The configuration file is stored in the platform-appropriate location:
//! - **Linux**: `~/.config/org.mocap-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/org.mocap-rs/config.toml`
//! - **Windows**: `%APPDATA%\org.mocap-rs\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use mocap_rs::config::{default_config_path, Config};
//! use mocap_rs::io::C3DFileIO;
//!
//! let config = default_config_path()
//!     .map(Config::load_or_default)
//!     .unwrap_or_default();
//!
//! let mut codec = C3DFileIO::new();
//! config.codec.apply(&mut codec);
//! ```

use crate::error::{MocapError, Result};
use crate::io::{AcquisitionFileIO, C3DFileIO};
use crate::types::{ByteOrder, StorageFormat, WritingFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for configuration directories
pub const APP_ID: &str = "org.mocap-rs";

/// Configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default tracing filter directive
pub const DEFAULT_LOG_FILTER: &str = "info,mocap_rs=debug";

// ==================== Config Directory ====================

/// Get the application configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default configuration file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Codec Config ====================

fn default_writing_flags() -> WritingFlags {
    WritingFlags::ALL
}

/// Defaults pushed into codecs before writing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Integer or float samples
    #[serde(default)]
    pub data_format: StorageFormat,

    /// Byte order of written files
    #[serde(default = "ByteOrder::native")]
    pub byte_order: ByteOrder,

    /// Derived state to recompute before encoding
    #[serde(default = "default_writing_flags")]
    pub writing_flags: WritingFlags,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            data_format: StorageFormat::default(),
            byte_order: ByteOrder::native(),
            writing_flags: default_writing_flags(),
        }
    }
}

impl CodecConfig {
    /// Push this configuration into a codec instance
    pub fn apply(&self, codec: &mut C3DFileIO) {
        codec.set_byte_order(self.byte_order);
        codec.set_storage_format(self.data_format);
        codec.set_writing_flags(self.writing_flags);
        tracing::debug!(
            "Codec configured: {} / {} (scales: {}, metadata: {})",
            self.byte_order,
            self.data_format,
            self.writing_flags.scales_from_data_update,
            self.writing_flags.metadata_from_data_update
        );
    }
}

// ==================== Logging Config ====================

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Logging settings for the command-line tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

// ==================== Config ====================

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub codec: CodecConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            MocapError::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            MocapError::Serialization(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load configuration, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MocapError::Configuration(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MocapError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            MocapError::Configuration(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
