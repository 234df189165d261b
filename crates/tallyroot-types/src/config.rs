//! Configuration for a tallyroot authority

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tallyroot_crypto::Address;
use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("io error:: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml parsing error:: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("toml serialization error:: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Unknown key or unparsable value
    #[error("invalid configuration value:: {0}")]
    InvalidValue(String),
}

/// Authority configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultisigConfig {
    /// Charged once per proposal when paying out to an account that does not exist yet
    pub account_creation_fee: u64,
    /// Bech32 prefix used when rendering addresses
    pub address_prefix: String,
    /// Tracing filter directive
    pub log_level: String,
}

impl Default for MultisigConfig {
    fn default() -> Self {
        Self {
            account_creation_fee: 1_000_000_000,
            address_prefix: "tally".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl MultisigConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: MultisigConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            home.join(".tallyroot")
        } else {
            PathBuf::from(".tallyroot")
        }
    }

    /// Get default configuration file path
    pub fn default_config_file() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Load configuration from default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_file();

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render `address` in bech32 with the configured prefix
    pub fn render_address(&self, address: &Address) -> Result<String, ConfigError> {
        address
            .to_bech32(&self.address_prefix)
            .map_err(|e| ConfigError::InvalidValue(format!("address_prefix:: {e}")))
    }

    /// Set a configuration value
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "account_creation_fee" => {
                self.account_creation_fee = value.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("account_creation_fee:: {value}"))
                })?;
            }
            "address_prefix" => {
                Address::default()
                    .to_bech32(value)
                    .map_err(|e| ConfigError::InvalidValue(format!("address_prefix:: {e}")))?;
                self.address_prefix = value.to_string();
            }
            "log_level" => self.log_level = value.to_string(),
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown configuration key:: {key}"
                )));
            }
        }
        Ok(())
    }
}
