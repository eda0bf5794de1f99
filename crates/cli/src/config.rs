//! Configuration management for the Voltage CLI.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/voltage/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use voltage_protocol::{ChannelConfig, CompressionKind, KeyPair};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("private_key is not valid base64: {0}")]
    InvalidPrivateKeyEncoding(String),

    #[error("private_key is not a valid P-256 private key: {0}")]
    InvalidPrivateKey(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the Voltage CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Secure channel settings.
    pub channel: ChannelSection,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Secure channel configuration.
#[derive(Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ChannelSection {
    /// Compress payloads before encryption. Both peers must agree.
    pub enable_compression: bool,

    /// Base64-encoded 32-byte P-256 private key. A fresh key is generated
    /// per channel when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl std::fmt::Debug for ChannelSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSection")
            .field("enable_compression", &self.enable_compression)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voltage")
        .join("config.toml")
}

impl ChannelSection {
    /// Decodes the configured private key, if any.
    pub fn private_key_bytes(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let Some(encoded) = &self.private_key else {
            return Ok(None);
        };

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| ConfigError::InvalidPrivateKeyEncoding(e.to_string()))?;
        KeyPair::from_private_bytes(&bytes)
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;

        Ok(Some(bytes))
    }

    /// Stores a key pair's private key, base64-encoded.
    pub fn set_private_key(&mut self, keys: &KeyPair) {
        self.private_key = Some(BASE64.encode(keys.private_key_bytes().as_slice()));
    }
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - VOLTAGE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - VOLTAGE_COMPRESSION: Override compression (lz4/on/true or none/off/false)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("VOLTAGE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.logging.log_level = level;
            }
        }

        if let Ok(value) = std::env::var("VOLTAGE_COMPRESSION") {
            if !value.is_empty() {
                match value.parse::<CompressionKind>() {
                    Ok(kind) => {
                        tracing::info!("Overriding compression from environment: {:?}", kind);
                        self.channel.enable_compression = kind == CompressionKind::Lz4;
                    }
                    Err(e) => {
                        tracing::warn!("Ignoring VOLTAGE_COMPRESSION: {}", e);
                    }
                }
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }

        self.channel.private_key_bytes()?;

        Ok(())
    }

    /// Builds the library channel configuration.
    pub fn channel_config(&self) -> Result<ChannelConfig, ConfigError> {
        Ok(ChannelConfig {
            enable_compression: self.channel.enable_compression,
            private_key: self.channel.private_key_bytes()?,
        })
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
