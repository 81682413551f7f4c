//! Configuration management for Elektra
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{ElektraError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ostrom API credentials and endpoints
    pub ostrom: OstromConfig,

    /// Refresh cadence and retry behaviour
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// IANA timezone used to determine the contract-local calendar day
    pub timezone: String,
}

/// Ostrom API credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OstromConfig {
    /// OAuth2 client id
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// ZIP code of the supplied tariff
    pub zip_code: String,

    /// Price/fee query endpoint base URL
    #[serde(default = "OstromConfig::default_base_url")]
    pub base_url: String,

    /// OAuth2 token endpoint URL
    #[serde(default = "OstromConfig::default_auth_url")]
    pub auth_url: String,
}

impl OstromConfig {
    fn default_base_url() -> String {
        "https://production.ostrom-api.io".to_string()
    }

    fn default_auth_url() -> String {
        "https://auth.production.ostrom-api.io/oauth2/token".to_string()
    }
}

/// Refresh cadence and retry behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Safety refresh interval in seconds between hour boundaries
    pub refresh_interval_secs: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Initial retry backoff in seconds
    pub backoff_initial_secs: u64,

    /// Backoff cap in seconds
    pub backoff_max_secs: u64,

    /// Consecutive failures before the published snapshot is flagged stale
    pub stale_after_failures: u32,

    /// Delay after the top of the hour before the aligned refresh fires,
    /// giving the provider a moment to publish the new hour
    pub hour_alignment_delay_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file or directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    #[serde(default = "default_true")]
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Default for OstromConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            zip_code: String::new(),
            base_url: Self::default_base_url(),
            auth_url: Self::default_auth_url(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 900,
            request_timeout_secs: 10,
            backoff_initial_secs: 30,
            backoff_max_secs: 900,
            stale_after_failures: 2,
            hour_alignment_delay_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/elektra.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8099,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ostrom: OstromConfig::default(),
            polling: PollingConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
            timezone: "Europe/Berlin".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "elektra_config.yaml",
            "/data/elektra_config.yaml",
            "/etc/elektra/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse the configured timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| ElektraError::validation("timezone", "not a valid IANA timezone"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ostrom.client_id.trim().is_empty() {
            return Err(ElektraError::validation(
                "ostrom.client_id",
                "Client id cannot be empty",
            ));
        }

        if self.ostrom.client_secret.trim().is_empty() {
            return Err(ElektraError::validation(
                "ostrom.client_secret",
                "Client secret cannot be empty",
            ));
        }

        if self.ostrom.zip_code.trim().is_empty() {
            return Err(ElektraError::validation(
                "ostrom.zip_code",
                "ZIP code cannot be empty",
            ));
        }

        if self.polling.refresh_interval_secs == 0 {
            return Err(ElektraError::validation(
                "polling.refresh_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.polling.request_timeout_secs == 0 {
            return Err(ElektraError::validation(
                "polling.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.web.port == 0 {
            return Err(ElektraError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        self.tz()?;

        Ok(())
    }
}
