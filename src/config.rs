//! Configuration module for loading the `qrng` TOML configuration file.

use qrng_client::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_STREAM_URL, DEFAULT_TIMEOUT,
    StreamConfig,
};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "QRNG_API_KEY";
/// Environment variable overriding the REST base URL.
pub const ENV_BASE_URL: &str = "QRNG_BASE_URL";
/// Environment variable overriding the stream base URL.
pub const ENV_STREAM_URL: &str = "QRNG_STREAM_URL";
/// Environment variable overriding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "QRNG_TIMEOUT_SECS";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// API access settings.
    #[serde(default)]
    pub api: ApiConfig,
}

/// API access settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key; usually supplied through `QRNG_API_KEY` instead.
    pub api_key: Option<String>,
    /// REST base URL.
    pub base_url: String,
    /// WebSocket base URL.
    pub stream_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// How long `stream` waits for the worker on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("stream_url", &self.stream_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("shutdown_timeout_secs", &self.shutdown_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `QRNG_*` environment overrides.
    ///
    /// # Errors
    /// Returns error if `QRNG_TIMEOUT_SECS` is not a number.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    ///
    /// # Errors
    /// Returns error if the timeout override is not a number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(url) = lookup(ENV_STREAM_URL) {
            self.api.stream_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.api.timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("{ENV_TIMEOUT_SECS} must be a number of seconds"))
            })?;
        }
        Ok(())
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    /// Returns error if the key is missing, a URL has the wrong scheme or a
    /// timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_key()?;

        if !has_scheme(&self.api.base_url, &["http://", "https://"]) {
            return Err(ConfigError::InvalidValue(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.api.base_url
            )));
        }
        if !has_scheme(&self.api.stream_url, &["ws://", "wss://"]) {
            return Err(ConfigError::InvalidValue(format!(
                "stream_url must start with ws:// or wss://, got '{}'",
                self.api.stream_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be positive".to_string(),
            ));
        }
        if self.api.shutdown_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "shutdown_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the configured API key.
    ///
    /// # Errors
    /// Returns error if no non-empty key is configured.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.api.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::InvalidValue(format!(
                "an API key is required (set {ENV_API_KEY} or api.api_key)"
            ))),
        }
    }

    /// Builds the REST client configuration.
    ///
    /// # Errors
    /// Returns error if no API key is configured.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig::new(self.api_key()?)
            .with_base_url(&self.api.base_url)
            .with_timeout(Duration::from_secs(self.api.timeout_secs)))
    }

    /// Builds the streaming client configuration.
    ///
    /// # Errors
    /// Returns error if no API key is configured.
    pub fn stream_config(&self) -> Result<StreamConfig, ConfigError> {
        Ok(StreamConfig::new(self.api_key()?)
            .with_base_url(&self.api.stream_url)
            .with_shutdown_timeout(Duration::from_secs(self.api.shutdown_timeout_secs)))
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    schemes.iter().any(|scheme| url.starts_with(scheme))
}
