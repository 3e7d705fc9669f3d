//! Batched delivery of serialized lines to the ingest endpoint.
//!
//! Batches are sent one after another over a single keep-alive connection.
//! A batch that cannot be delivered ends the whole delivery; batches already
//! accepted by the endpoint stay delivered.

use crate::core::{retry_with_config, ExporterConfig, ExporterError, Result, RetryConfig};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Maximum number of lines in a single request
pub const MAX_BATCH_SIZE: usize = 1000;

const USER_AGENT_VALUE: &str = concat!("dtmetrics-rust/", env!("CARGO_PKG_VERSION"));

/// Sends one request body to the ingest endpoint.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a batch and return the HTTP status code.
    ///
    /// Returns [`ExporterError::Network`] when no response was received.
    async fn send(&self, body: Bytes) -> Result<u16>;
}

/// HTTP transport holding at most one idle connection to the endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Url,
}

impl HttpTransport {
    /// Create a transport for the configured endpoint
    pub fn new(config: &ExporterConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| ExporterError::config(format!("Invalid ingest URL '{}': {}", config.url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Api-Token {}", token))
                .map_err(|e| ExporterError::config(format!("Invalid API token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(1)
            .redirect(Policy::none())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExporterError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: Bytes) -> Result<u16> {
        let response = self
            .client
            .post(self.url.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| ExporterError::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            // read to the end so the connection can be reused
            if let Err(e) = response.bytes().await {
                debug!("Failed to read ingest response body: {}", e);
            }
        } else {
            match response.text().await {
                Ok(body) => debug!("Ingest endpoint responded with {}: {}", status, body),
                Err(e) => debug!("Ingest endpoint responded with {} (body unreadable: {})", status, e),
            }
        }

        Ok(status.as_u16())
    }
}

/// Delivery state: ready until an authorization failure or an explicit
/// shutdown, after which every delivery fails without I/O.
pub struct Delivery {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    shutdown: AtomicBool,
}

impl Delivery {
    /// Create a delivery over the given transport
    pub fn new(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            retry,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Whether the terminal state has been reached
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Enter the terminal state. Calling this again has no effect.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Deliver lines in batches of at most [`MAX_BATCH_SIZE`].
    pub async fn send(&self, lines: &[String]) -> Result<()> {
        if self.is_shutdown() {
            return Err(ExporterError::Shutdown);
        }

        let batches = lines.len().div_ceil(MAX_BATCH_SIZE);
        for (idx, batch) in lines.chunks(MAX_BATCH_SIZE).enumerate() {
            debug!("Sending batch {}/{} ({} lines)", idx + 1, batches, batch.len());

            if let Err(e) = self.send_batch(Bytes::from(batch.join("\n"))).await {
                if e.is_permanent() {
                    error!("Ingest endpoint rejected the credentials, shutting down exporter: {}", e);
                    self.shutdown();
                }
                if idx + 1 < batches {
                    warn!("Abandoning {} remaining batches", batches - idx - 1);
                }
                return Err(e);
            }
        }

        Ok(())
    }

    async fn send_batch(&self, body: Bytes) -> Result<()> {
        retry_with_config(&self.retry, || {
            let body = body.clone();
            async move {
                let status = self.transport.send(body).await?;
                debug!("Ingest endpoint responded with HTTP {}", status);

                if (200..300).contains(&status) {
                    Ok(())
                } else {
                    warn!("Ingest endpoint responded with HTTP {}", status);
                    Err(ExporterError::from_status(status))
                }
            }
        })
        .await
    }
}
