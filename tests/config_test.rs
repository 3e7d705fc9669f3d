//! Configuration system tests.

use dtmetrics::cli::Cli;
use dtmetrics::core::{Config, ConfigBuilder, LogLevel};
use dtmetrics::metrics::Dimension;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.exporter.url, "http://localhost:14499/metrics/ingest");
    assert_eq!(config.exporter.api_token, None);
    assert_eq!(config.exporter.max_retries, 3);
    assert_eq!(config.exporter.retry_delay, Duration::from_millis(1000));
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn test_yaml_config() {
    let yaml = r#"
exporter:
  url: "https://abc123.live.example.com/api/v2/metrics/ingest"
  api_token: "token"
  prefix: ""
  default_dimensions:
    - key: service
      value: checkout
    - key: region
      value: eu-west-1
  max_retries: 0
  retry_delay: 2s
  request_timeout: 5s
  metadata_enrichment: false
logging:
  level: warn
  structured: true
"#;

    let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();

    assert_eq!(config.exporter.effective_prefix(), None);
    assert_eq!(
        config.exporter.default_dimensions,
        vec![Dimension::new("service", "checkout"), Dimension::new("region", "eu-west-1")]
    );
    assert_eq!(config.exporter.max_retries, 0);
    assert_eq!(config.exporter.retry_delay, Duration::from_secs(2));
    assert_eq!(config.exporter.request_timeout, Duration::from_secs(5));
    assert!(!config.exporter.metadata_enrichment);
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert!(config.logging.structured);
}

#[test]
fn test_invalid_yaml_is_a_config_error() {
    let result = ConfigBuilder::new().from_yaml("exporter: [not, a, map]");
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().category(), "config");
}

#[test]
fn test_invalid_scheme_rejected_at_build() {
    let yaml = r#"
exporter:
  url: "unix:///var/run/ingest.sock"
"#;
    let result = ConfigBuilder::new().from_yaml(yaml).unwrap().build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cli_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dtmetrics.yaml");
    fs::write(
        &path,
        r#"
exporter:
  url: "http://file.example.com/ingest"
  prefix: "from_file"
  max_retries: 7
"#,
    )
    .unwrap();

    let cli = Cli {
        config: Some(path),
        prefix: Some("from_cli".to_string()),
        ..Cli::default()
    };
    let config = cli.load_config().await.unwrap();

    assert_eq!(config.exporter.url, "http://file.example.com/ingest");
    assert_eq!(config.exporter.prefix.as_deref(), Some("from_cli"));
    assert_eq!(config.exporter.max_retries, 7);
}

#[tokio::test]
async fn test_missing_config_file_is_an_error() {
    let cli = Cli {
        config: Some(PathBuf::from("/definitely/not/here.yaml")),
        ..Cli::default()
    };
    assert!(cli.load_config().await.is_err());
}
