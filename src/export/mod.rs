//! Line-protocol export of collected metrics.
//!
//! The host collector drives an exporter through [`PushMetricExporter`].
//! Each snapshot is classified point by point, turned into lines and handed
//! to [`Delivery`].

pub mod delivery;

pub use delivery::{Delivery, HttpTransport, Transport, MAX_BATCH_SIZE};

use crate::core::{ExporterConfig, ExporterError, Result, RetryConfig};
use crate::metrics::{
    estimate_summary, read_metadata, AttributeValue, Dimension, InstrumentKind, Metric, MetricData,
    MetricFactory, MetricLine, ResourceMetrics, Temporality,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Failed line constructions are logged once per this many occurrences
const FAILURE_LOG_INTERVAL: usize = 1000;

/// Operations a host metrics SDK invokes on a push exporter.
#[async_trait::async_trait]
pub trait PushMetricExporter: Send + Sync {
    /// Export one collected snapshot
    async fn export(&self, metrics: &ResourceMetrics) -> Result<()>;

    /// Flush buffered data
    async fn force_flush(&self) -> Result<()>;

    /// Stop the exporter; later exports fail
    fn shutdown(&self);

    /// Temporality the host should aggregate an instrument kind with
    fn temporality(&self, kind: InstrumentKind) -> Temporality;
}

/// Temporality the exporter can send without keeping state.
///
/// Counters and histograms are sent as deltas. Gauges and up-down counters
/// are sent as their current (cumulative) value.
pub fn preferred_temporality(kind: InstrumentKind) -> Temporality {
    match kind {
        InstrumentKind::Gauge
        | InstrumentKind::ObservableGauge
        | InstrumentKind::UpDownCounter
        | InstrumentKind::ObservableUpDownCounter => Temporality::Cumulative,
        InstrumentKind::Counter | InstrumentKind::ObservableCounter | InstrumentKind::Histogram => {
            Temporality::Delta
        },
    }
}

/// What happens to the points of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    /// Sent as delta counters
    DeltaCounter,
    /// Sent as gauges
    Gauge,
    /// Estimated and sent as summaries
    Summary,
    /// Not sent
    Drop(DropReason),
}

/// Why a metric is not sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Monotonic sum with cumulative temporality
    CumulativeMonotonicSum,
    /// Non-monotonic sum with delta temporality
    DeltaNonMonotonicSum,
    /// Histogram with cumulative temporality
    CumulativeHistogram,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::CumulativeMonotonicSum => f.write_str("cumulative monotonic sums are not supported"),
            DropReason::DeltaNonMonotonicSum => f.write_str("delta non-monotonic sums are not supported"),
            DropReason::CumulativeHistogram => f.write_str("cumulative histograms are not supported"),
        }
    }
}

/// Decide the treatment of a metric from its data kind and temporality
pub fn classify(data: &MetricData, temporality: Temporality) -> Treatment {
    match (data, temporality) {
        (MetricData::Sum { is_monotonic: true, .. }, Temporality::Delta) => Treatment::DeltaCounter,
        (MetricData::Sum { is_monotonic: true, .. }, Temporality::Cumulative) => {
            Treatment::Drop(DropReason::CumulativeMonotonicSum)
        },
        (MetricData::Sum { is_monotonic: false, .. }, Temporality::Cumulative) => Treatment::Gauge,
        (MetricData::Sum { is_monotonic: false, .. }, Temporality::Delta) => {
            Treatment::Drop(DropReason::DeltaNonMonotonicSum)
        },
        (MetricData::Gauge { .. }, _) => Treatment::Gauge,
        (MetricData::Histogram { .. }, Temporality::Delta) => Treatment::Summary,
        (MetricData::Histogram { .. }, Temporality::Cumulative) => {
            Treatment::Drop(DropReason::CumulativeHistogram)
        },
    }
}

/// Exporter writing the line protocol over HTTP
pub struct LineProtocolExporter {
    factory: MetricFactory,
    delivery: Delivery,
    failures: AtomicUsize,
}

impl LineProtocolExporter {
    /// Create an exporter sending to the configured endpoint
    pub fn new(config: &ExporterConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create an exporter sending through a custom transport
    pub fn with_transport(config: &ExporterConfig, transport: Arc<dyn Transport>) -> Self {
        let mut factory = MetricFactory::new(config.effective_prefix(), &config.default_dimensions);
        if config.metadata_enrichment {
            factory = factory.with_static_dimensions(&read_metadata());
        }

        info!(
            "Exporting metrics to {} (max retries {}, retry delay {:?})",
            config.url, config.max_retries, config.retry_delay
        );

        Self {
            factory,
            delivery: Delivery::new(transport, RetryConfig::new(config.max_retries, config.retry_delay)),
            failures: AtomicUsize::new(0),
        }
    }

    /// The factory lines are built with
    pub fn factory(&self) -> &MetricFactory {
        &self.factory
    }

    /// Whether the exporter has been shut down
    pub fn is_shutdown(&self) -> bool {
        self.delivery.is_shutdown()
    }

    /// Serialize every sendable point of a snapshot, in snapshot order
    pub fn serialize(&self, metrics: &ResourceMetrics) -> Vec<String> {
        let mut lines = Vec::with_capacity(metrics.point_count());
        for metric in metrics.metrics() {
            match classify(&metric.data, metric.temporality) {
                Treatment::Drop(reason) => {
                    warn!("Dropping metric '{}': {}", metric.name, reason);
                },
                treatment => self.build_lines(metric, treatment, &mut lines),
            }
        }
        lines
    }

    fn build_lines(&self, metric: &Metric, treatment: Treatment, lines: &mut Vec<String>) {
        let name = metric.name.as_str();
        match (&metric.data, treatment) {
            (MetricData::Sum { data_points, .. }, Treatment::DeltaCounter) => {
                for point in data_points {
                    let dimensions = self.dimensions(name, &point.attributes);
                    self.push(
                        lines,
                        self.factory
                            .create_delta_counter(name, &dimensions, point.value, point.timestamp_millis),
                    );
                }
            },
            (MetricData::Sum { data_points, .. } | MetricData::Gauge { data_points }, Treatment::Gauge) => {
                for point in data_points {
                    let dimensions = self.dimensions(name, &point.attributes);
                    self.push(
                        lines,
                        self.factory
                            .create_gauge(name, &dimensions, point.value, point.timestamp_millis),
                    );
                }
            },
            (MetricData::Histogram { data_points }, Treatment::Summary) => {
                for point in data_points {
                    if point.value.count == 0 {
                        debug!("Skipping empty histogram point of '{}'", name);
                        continue;
                    }
                    let dimensions = self.dimensions(name, &point.attributes);
                    let summary = estimate_summary(&point.value);
                    self.push(
                        lines,
                        self.factory
                            .create_summary(name, &dimensions, summary, point.timestamp_millis),
                    );
                }
            },
            _ => {},
        }
    }

    fn dimensions(&self, name: &str, attributes: &BTreeMap<String, AttributeValue>) -> Vec<Dimension> {
        attributes
            .iter()
            .filter_map(|(key, value)| match value.as_dimension_value() {
                Some(value) => Some(Dimension::new(key.as_str(), value)),
                None => {
                    warn!("Skipping attribute '{}' of '{}': unsupported value type", key, name);
                    None
                },
            })
            .collect()
    }

    fn push(&self, lines: &mut Vec<String>, line: Result<MetricLine>) {
        match line {
            Ok(line) => lines.push(line.serialize()),
            Err(e) => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed);
                if failures % FAILURE_LOG_INTERVAL == 0 {
                    warn!("Failed to create metric line ({} failures so far): {}", failures + 1, e);
                }
            },
        }
    }
}

#[async_trait::async_trait]
impl PushMetricExporter for LineProtocolExporter {
    async fn export(&self, metrics: &ResourceMetrics) -> Result<()> {
        if self.delivery.is_shutdown() {
            warn!("Export called after shutdown");
            return Err(ExporterError::Shutdown);
        }

        let lines = self.serialize(metrics);
        if lines.is_empty() {
            debug!("Nothing to export");
            return Ok(());
        }

        debug!("Exporting {} lines", lines.len());
        self.delivery.send(&lines).await
    }

    async fn force_flush(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) {
        self.delivery.shutdown();
    }

    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        preferred_temporality(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DataPoint, HistogramValue, Number};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingTransport {
        bodies: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, body: Bytes) -> Result<u16> {
            self.bodies.lock().push(String::from_utf8_lossy(&body).into_owned());
            Ok(202)
        }
    }

    fn exporter() -> (LineProtocolExporter, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let config = ExporterConfig {
            metadata_enrichment: false,
            ..ExporterConfig::default()
        };
        let exporter = LineProtocolExporter::with_transport(&config, Arc::clone(&transport) as Arc<dyn Transport>);
        (exporter, transport)
    }

    fn delta_counter(name: &str, value: Number) -> Metric {
        Metric::counter(
            name,
            Temporality::Delta,
            vec![DataPoint::new(value).with_attribute("key", "value")],
        )
    }

    #[test]
    fn test_preferred_temporality() {
        assert_eq!(preferred_temporality(InstrumentKind::Counter), Temporality::Delta);
        assert_eq!(preferred_temporality(InstrumentKind::ObservableCounter), Temporality::Delta);
        assert_eq!(preferred_temporality(InstrumentKind::Histogram), Temporality::Delta);
        assert_eq!(preferred_temporality(InstrumentKind::UpDownCounter), Temporality::Cumulative);
        assert_eq!(
            preferred_temporality(InstrumentKind::ObservableUpDownCounter),
            Temporality::Cumulative
        );
        assert_eq!(preferred_temporality(InstrumentKind::ObservableGauge), Temporality::Cumulative);
        assert_eq!(preferred_temporality(InstrumentKind::Gauge), Temporality::Cumulative);
    }

    #[test]
    fn test_classification_table() {
        let monotonic = MetricData::Sum {
            is_monotonic: true,
            data_points: vec![],
        };
        let non_monotonic = MetricData::Sum {
            is_monotonic: false,
            data_points: vec![],
        };
        let gauge = MetricData::Gauge { data_points: vec![] };
        let histogram = MetricData::Histogram { data_points: vec![] };

        use Temporality::{Cumulative, Delta};
        assert_eq!(classify(&monotonic, Delta), Treatment::DeltaCounter);
        assert_eq!(
            classify(&monotonic, Cumulative),
            Treatment::Drop(DropReason::CumulativeMonotonicSum)
        );
        assert_eq!(classify(&non_monotonic, Cumulative), Treatment::Gauge);
        assert_eq!(
            classify(&non_monotonic, Delta),
            Treatment::Drop(DropReason::DeltaNonMonotonicSum)
        );
        assert_eq!(classify(&gauge, Delta), Treatment::Gauge);
        assert_eq!(classify(&gauge, Cumulative), Treatment::Gauge);
        assert_eq!(classify(&histogram, Delta), Treatment::Summary);
        assert_eq!(
            classify(&histogram, Cumulative),
            Treatment::Drop(DropReason::CumulativeHistogram)
        );
    }

    #[test]
    fn test_serialize_delta_counter() {
        let (exporter, _) = exporter();
        let snapshot = ResourceMetrics::single_scope("test", vec![delta_counter("test", 3.2.into())]);
        assert_eq!(exporter.serialize(&snapshot), vec!["test,key=value,dt.metrics.source=opentelemetry count,delta=3.2"]);
    }

    #[test]
    fn test_serialize_histogram_estimates_extrema() {
        let (exporter, _) = exporter();
        let value = HistogramValue::new(vec![1.0, 3.0, 5.0, 10.0], vec![3, 1, 2, 0, 1]).with_sum(22.4);
        let snapshot = ResourceMetrics::single_scope(
            "test",
            vec![Metric::histogram(
                "metric",
                Temporality::Delta,
                vec![DataPoint::new(value).with_attribute("key", "value")],
            )],
        );
        assert_eq!(
            exporter.serialize(&snapshot),
            vec!["metric,key=value,dt.metrics.source=opentelemetry gauge,min=1,max=10,sum=22.4,count=7"]
        );
    }

    #[test]
    fn test_serialize_histogram_with_exact_extrema() {
        let (exporter, _) = exporter();
        let value = HistogramValue::new(vec![1.0, 3.0, 5.0, 10.0], vec![3, 1, 2, 0, 1])
            .with_sum(22.4)
            .with_extrema(0.9, 10.1);
        let snapshot = ResourceMetrics::single_scope(
            "test",
            vec![Metric::histogram(
                "metric",
                Temporality::Delta,
                vec![DataPoint::new(value).with_attribute("key", "value")],
            )],
        );
        assert_eq!(
            exporter.serialize(&snapshot),
            vec!["metric,key=value,dt.metrics.source=opentelemetry gauge,min=0.9,max=10.1,sum=22.4,count=7"]
        );
    }

    #[test]
    fn test_serialize_policy_drops() {
        let (exporter, _) = exporter();
        let snapshot = ResourceMetrics::single_scope(
            "test",
            vec![
                Metric::counter("cumulative", Temporality::Cumulative, vec![DataPoint::new(1.into())]),
                Metric::up_down_counter("delta_updown", Temporality::Delta, vec![DataPoint::new(1.into())]),
                Metric::histogram(
                    "empty",
                    Temporality::Delta,
                    vec![DataPoint::new(HistogramValue::new(vec![1.0], vec![0, 0]))],
                ),
                Metric::up_down_counter("queue", Temporality::Cumulative, vec![DataPoint::new((-4).into())]),
                Metric::gauge("temperature", Temporality::Delta, vec![DataPoint::new(21.5.into())]),
            ],
        );
        assert_eq!(exporter.serialize(&snapshot), vec!["queue,dt.metrics.source=opentelemetry gauge,-4", "temperature,dt.metrics.source=opentelemetry gauge,21.5"]);
    }

    #[test]
    fn test_invalid_points_are_skipped() {
        let (exporter, _) = exporter();
        let snapshot = ResourceMetrics::single_scope(
            "test",
            vec![
                delta_counter("~~~", 1.into()),
                delta_counter("nan", f64::NAN.into()),
                Metric::counter(
                    "ok",
                    Temporality::Delta,
                    vec![DataPoint::new(2.into())
                        .with_attribute("list", AttributeValue::Array(vec!["a".into()]))
                        .with_attribute("flag", true)
                        .with_timestamp(1_700_000_000_000)],
                ),
            ],
        );
        assert_eq!(
            exporter.serialize(&snapshot),
            vec!["ok,flag=true,dt.metrics.source=opentelemetry count,delta=2 1700000000000"]
        );
        assert_eq!(exporter.failures.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_export_sends_lines() {
        let (exporter, transport) = exporter();
        let snapshot = ResourceMetrics::single_scope(
            "test",
            vec![delta_counter("a", 1.into()), delta_counter("b", 2.into())],
        );
        exporter.export(&snapshot).await.unwrap();
        assert_eq!(
            *transport.bodies.lock(),
            vec!["a,key=value,dt.metrics.source=opentelemetry count,delta=1\nb,key=value,dt.metrics.source=opentelemetry count,delta=2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_export_sends_nothing() {
        let (exporter, transport) = exporter();
        exporter.export(&ResourceMetrics::default()).await.unwrap();
        exporter
            .export(&ResourceMetrics::single_scope("test", vec![Metric::gauge("g", Temporality::Cumulative, vec![])]))
            .await
            .unwrap();
        assert!(transport.bodies.lock().is_empty());
    }

    #[tokio::test]
    async fn test_export_after_shutdown_fails() {
        let (exporter, transport) = exporter();
        exporter.shutdown();
        exporter.shutdown();
        assert!(exporter.is_shutdown());

        let result = exporter
            .export(&ResourceMetrics::single_scope("test", vec![delta_counter("a", 1.into())]))
            .await;
        assert!(matches!(result, Err(ExporterError::Shutdown)));
        assert!(matches!(
            exporter.export(&ResourceMetrics::default()).await,
            Err(ExporterError::Shutdown)
        ));
        assert!(transport.bodies.lock().is_empty());
        assert!(exporter.force_flush().await.is_ok());
    }

    #[test]
    fn test_prefix_and_default_dimensions() {
        let config = ExporterConfig {
            prefix: Some("app".to_string()),
            default_dimensions: vec![Dimension::new("env", "prod")],
            metadata_enrichment: false,
            ..ExporterConfig::default()
        };
        let exporter =
            LineProtocolExporter::with_transport(&config, Arc::new(RecordingTransport::default()));
        let snapshot = ResourceMetrics::single_scope("test", vec![delta_counter("requests", 5.into())]);
        assert_eq!(
            exporter.serialize(&snapshot),
            vec!["app.requests,env=prod,key=value,dt.metrics.source=opentelemetry count,delta=5"]
        );
    }
}
