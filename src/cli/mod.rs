//! Command-line interface.
//!
//! Reads one metric snapshot and exports it:
//! `dtmetrics --url https://.../api/v2/metrics/ingest --api-token ... snapshot.json`

use crate::core::{Config, ConfigBuilder, ExporterError, Result};
use crate::export::{LineProtocolExporter, PushMetricExporter};
use crate::metrics::ResourceMetrics;
use crate::otlp;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Export a metric snapshot to a line-protocol ingest endpoint
#[derive(Parser, Debug, Default)]
#[command(name = "dtmetrics")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Snapshot to export ("-" or omitted reads standard input)
    pub input: Option<PathBuf>,

    /// Input is a protobuf-encoded OTLP ExportMetricsServiceRequest
    #[arg(long)]
    pub otlp: bool,

    /// Configuration file path
    #[arg(short, long, env = "DTMETRICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ingest endpoint
    #[arg(long, env = "DTMETRICS_URL")]
    pub url: Option<String>,

    /// API token for the ingest endpoint
    #[arg(long, env = "DTMETRICS_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Prefix for every metric name
    #[arg(long, env = "DTMETRICS_PREFIX")]
    pub prefix: Option<String>,

    /// Retries after a transport error
    #[arg(long, env = "DTMETRICS_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Pause between attempts in milliseconds
    #[arg(long, env = "DTMETRICS_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// Do not add host metadata dimensions
    #[arg(long, env = "DTMETRICS_NO_METADATA")]
    pub no_metadata: bool,

    /// Enable debug logging
    #[arg(short, long, env = "DTMETRICS_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Print the serialized lines instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        if let Some(path) = &self.config {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                ExporterError::config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            builder = builder.from_yaml(&content)?;
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(url) = &self.url {
            builder = builder.url(url.as_str());
        }
        if let Some(token) = &self.api_token {
            builder = builder.api_token(token.as_str());
        }
        if let Some(prefix) = &self.prefix {
            builder = builder.prefix(prefix.as_str());
        }
        if let Some(retries) = self.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(delay) = self.retry_delay_ms {
            builder = builder.retry_delay(Duration::from_millis(delay));
        }
        if self.no_metadata {
            builder = builder.metadata_enrichment(false);
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let log_level = if self.debug || config.debug {
            "debug"
        } else {
            config.logging.level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        // stdout is reserved for --dry-run output
        let fmt_layer = if config.logging.structured {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .compact()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ExporterError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }

    /// Read and decode the input snapshot.
    pub async fn read_snapshot(&self) -> Result<ResourceMetrics> {
        let bytes = match &self.input {
            Some(path) if path.as_os_str() != "-" => tokio::fs::read(path).await?,
            _ => {
                let mut buf = Vec::new();
                tokio::io::stdin().read_to_end(&mut buf).await?;
                buf
            },
        };

        if self.otlp {
            otlp::decode_request(&bytes)
        } else {
            Ok(serde_json::from_slice(&bytes)?)
        }
    }
}

/// Execute one export run.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config)?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Ingest URL: {}", config.exporter.url);
        println!("  API token: {}", if config.exporter.api_token.is_some() { "set" } else { "not set" });
        println!("  Prefix: {}", config.exporter.effective_prefix().unwrap_or("<none>"));
        println!("  Default dimensions: {}", config.exporter.default_dimensions.len());
        println!("  Max retries: {}", config.exporter.max_retries);
        println!("  Retry delay: {:?}", config.exporter.retry_delay);
        println!("  Metadata enrichment: {}", config.exporter.metadata_enrichment);
        return Ok(());
    }

    let snapshot = cli.read_snapshot().await?;
    let exporter = LineProtocolExporter::new(&config.exporter)?;

    if cli.dry_run {
        for line in exporter.serialize(&snapshot) {
            println!("{}", line);
        }
        return Ok(());
    }

    let result = exporter.export(&snapshot).await;
    exporter.shutdown();

    match &result {
        Ok(()) => tracing::info!("Exported {} data points", snapshot.point_count()),
        Err(e) => tracing::error!("Export failed ({}): {}", e.category(), e),
    }
    result
}
