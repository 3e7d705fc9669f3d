//! Configuration, error taxonomy and retry policy shared by the exporter.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod retry;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, ExporterConfig, LogLevel, LoggingConfig, DEFAULT_INGEST_URL};
pub use error::{ExporterError, Result};
pub use retry::{retry_with_config, RetryConfig};
