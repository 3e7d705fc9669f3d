//! Configuration management for the exporter.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Environment variable and CLI overrides (applied by the binary)
//! - Validation and defaults

use crate::core::{ExporterError, Result};
use crate::metrics::Dimension;
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ingest endpoint of a locally installed agent
pub const DEFAULT_INGEST_URL: &str = "http://localhost:14499/metrics/ingest";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exporter configuration
    pub exporter: ExporterConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Exporter configuration, fixed for the lifetime of an exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Ingest endpoint
    pub url: String,
    /// API token sent as `Authorization: Api-Token <token>`
    pub api_token: Option<String>,
    /// Prefix prepended to every metric name
    pub prefix: Option<String>,
    /// Dimensions added to every line
    pub default_dimensions: Vec<Dimension>,
    /// Additional attempts after a transport error
    pub max_retries: u32,
    /// Pause between attempts
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Timeout of a single request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Add host metadata dimensions
    pub metadata_enrichment: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Structured logging format
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything
    Trace,
    /// Per-request details
    Debug,
    /// Lifecycle events
    Info,
    /// Dropped data and failed requests
    Warn,
    /// Failed exports only
    Error,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            url: DEFAULT_INGEST_URL.to_string(),
            api_token: None,
            prefix: None,
            default_dimensions: Vec::new(),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
            metadata_enrichment: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.exporter.validate()
    }
}

impl ExporterConfig {
    /// Validate the exporter settings
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| ExporterError::config(format!("Invalid ingest URL '{}': {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExporterError::config(format!(
                "Ingest URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if let Some(token) = &self.api_token {
            if token.is_empty() {
                return Err(ExporterError::config("api_token must not be empty"));
            }
            if HeaderValue::from_str(&format!("Api-Token {}", token)).is_err() {
                return Err(ExporterError::config("api_token contains characters not allowed in a header"));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(ExporterError::config("request_timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Prefix to use, treating an empty prefix as none
    pub fn effective_prefix(&self) -> Option<&str> {
        self.prefix.as_deref().filter(|p| !p.is_empty())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| ExporterError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set the ingest endpoint
    pub fn url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.exporter.url = url.into();
        self
    }

    /// Set the API token
    pub fn api_token<S: Into<String>>(mut self, token: S) -> Self {
        self.config.exporter.api_token = Some(token.into());
        self
    }

    /// Set the metric name prefix
    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.exporter.prefix = Some(prefix.into());
        self
    }

    /// Add a default dimension
    pub fn default_dimension<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config
            .exporter
            .default_dimensions
            .push(Dimension::new(key, value));
        self
    }

    /// Set the number of retries after a transport error
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.exporter.max_retries = retries;
        self
    }

    /// Set the pause between attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.exporter.retry_delay = delay;
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.exporter.request_timeout = timeout;
        self
    }

    /// Enable or disable host metadata dimensions
    pub fn metadata_enrichment(mut self, enable: bool) -> Self {
        self.config.exporter.metadata_enrichment = enable;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
