//! Common test utilities and fixtures.
#![allow(dead_code)]

use dtmetrics::core::ExporterConfig;
use dtmetrics::metrics::{DataPoint, Metric, Number, ResourceMetrics, Temporality};
use std::time::Duration;

/// Exporter configuration pointing at a test endpoint, without host metadata
/// and without retry delay.
pub fn test_config(url: &str) -> ExporterConfig {
    ExporterConfig {
        url: url.to_string(),
        api_token: Some("test-token".to_string()),
        retry_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        metadata_enrichment: false,
        ..ExporterConfig::default()
    }
}

/// Test fixture builder for delta counter snapshots.
pub struct SnapshotBuilder {
    metrics: Vec<Metric>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self { metrics: Vec::new() }
    }

    /// One delta counter with one point per value, each tagged with its index.
    pub fn delta_counter(mut self, name: &str, values: &[i64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| DataPoint::new(Number::from(*v)).with_attribute("idx", i as i64))
            .collect();
        self.metrics.push(Metric::counter(name, Temporality::Delta, points));
        self
    }

    /// A delta counter with `count` points.
    pub fn many_points(self, name: &str, count: usize) -> Self {
        let values = vec![1; count];
        self.delta_counter(name, &values)
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn build(self) -> ResourceMetrics {
        ResourceMetrics::single_scope("test", self.metrics)
    }
}

/// Split a request body into lines.
pub fn body_lines(body: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(body).lines().map(str::to_string).collect()
}
