//! Construction of validated metric lines.

use crate::core::{ExporterError, Result};
use crate::metrics::line::{MetricLine, MetricValue, SummaryValue};
use crate::metrics::normalize::{normalize_dimensions, normalize_metric_key};
use crate::metrics::types::{Dimension, Number};

/// Dimension attached to every line to mark where it came from.
pub const SOURCE_DIMENSION_KEY: &str = "dt.metrics.source";
/// Value of [`SOURCE_DIMENSION_KEY`].
pub const SOURCE_DIMENSION_VALUE: &str = "opentelemetry";

/// Builds [`MetricLine`]s with a common prefix and common dimensions.
///
/// Dimensions are merged in the order default, call-site, source, static. A
/// key that occurs more than once keeps the position of its first occurrence
/// and the value of its last one, so only static dimensions can replace the
/// source dimension.
#[derive(Debug, Clone, Default)]
pub struct MetricFactory {
    prefix: Option<String>,
    default_dimensions: Vec<Dimension>,
    static_dimensions: Vec<Dimension>,
}

impl MetricFactory {
    /// Create a factory. An empty prefix counts as no prefix.
    pub fn new(prefix: Option<&str>, default_dimensions: &[Dimension]) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            default_dimensions: merge_dimensions(&normalize_dimensions(default_dimensions)),
            static_dimensions: Vec::new(),
        }
    }

    /// Attach dimensions that override every other dimension source
    pub fn with_static_dimensions(mut self, dimensions: &[Dimension]) -> Self {
        self.static_dimensions = merge_dimensions(&normalize_dimensions(dimensions));
        self
    }

    /// Normalized default dimensions
    pub fn default_dimensions(&self) -> &[Dimension] {
        &self.default_dimensions
    }

    /// Normalized static dimensions
    pub fn static_dimensions(&self) -> &[Dimension] {
        &self.static_dimensions
    }

    /// Running total of a count
    pub fn create_total_counter(
        &self,
        name: &str,
        dimensions: &[Dimension],
        value: Number,
        timestamp_millis: Option<u64>,
    ) -> Result<MetricLine> {
        let key = self.metric_key(name)?;
        check_number(&key, value)?;
        Ok(self.line(key, dimensions, MetricValue::TotalCounter(value), timestamp_millis))
    }

    /// Change of a count since the previous export
    pub fn create_delta_counter(
        &self,
        name: &str,
        dimensions: &[Dimension],
        value: Number,
        timestamp_millis: Option<u64>,
    ) -> Result<MetricLine> {
        let key = self.metric_key(name)?;
        check_number(&key, value)?;
        Ok(self.line(key, dimensions, MetricValue::DeltaCounter(value), timestamp_millis))
    }

    /// Point-in-time measurement
    pub fn create_gauge(
        &self,
        name: &str,
        dimensions: &[Dimension],
        value: Number,
        timestamp_millis: Option<u64>,
    ) -> Result<MetricLine> {
        let key = self.metric_key(name)?;
        check_number(&key, value)?;
        Ok(self.line(key, dimensions, MetricValue::Gauge(value), timestamp_millis))
    }

    /// Min/max/sum/count of a distribution
    pub fn create_summary(
        &self,
        name: &str,
        dimensions: &[Dimension],
        value: SummaryValue,
        timestamp_millis: Option<u64>,
    ) -> Result<MetricLine> {
        let key = self.metric_key(name)?;
        if !value.is_finite() {
            return Err(ExporterError::invalid_value(key, "summary fields must be finite"));
        }
        Ok(self.line(key, dimensions, MetricValue::Summary(value), timestamp_millis))
    }

    fn metric_key(&self, name: &str) -> Result<String> {
        let full_name = match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name.to_string(),
        };
        normalize_metric_key(&full_name).ok_or(ExporterError::InvalidMetricKey(full_name))
    }

    fn line(
        &self,
        key: String,
        dimensions: &[Dimension],
        value: MetricValue,
        timestamp_millis: Option<u64>,
    ) -> MetricLine {
        let call_site = normalize_dimensions(dimensions);
        let source = Dimension::new(SOURCE_DIMENSION_KEY, SOURCE_DIMENSION_VALUE);
        let dimensions = merge_dimensions(
            self.default_dimensions
                .iter()
                .chain(&call_site)
                .chain(std::iter::once(&source))
                .chain(&self.static_dimensions),
        );
        MetricLine::new(key, dimensions, value, timestamp_millis)
    }
}

fn check_number(key: &str, value: Number) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ExporterError::invalid_value(key, format!("{} is not a finite number", value)))
    }
}

fn merge_dimensions<'a, I>(dimensions: I) -> Vec<Dimension>
where
    I: IntoIterator<Item = &'a Dimension>,
{
    let mut merged: Vec<Dimension> = Vec::new();
    for dimension in dimensions {
        match merged.iter_mut().find(|d| d.key == dimension.key) {
            Some(existing) => existing.value.clone_from(&dimension.value),
            None => merged.push(dimension.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOW: u64 = 1_640_995_200_000;

    #[test]
    fn test_all_kinds_without_prefix() {
        let factory = MetricFactory::new(None, &[]);

        let counter = factory.create_total_counter("name", &[], 25.into(), Some(NOW)).unwrap();
        let delta = factory.create_delta_counter("name", &[], 25.into(), Some(NOW)).unwrap();
        let gauge = factory.create_gauge("name", &[], 25.into(), Some(NOW)).unwrap();
        let summary = factory
            .create_summary("name", &[], SummaryValue::new(1.0, 5.0, 12.0, 4), None)
            .unwrap();

        assert_eq!(counter.serialize(), format!("name,dt.metrics.source=opentelemetry count,25 {}", NOW));
        assert_eq!(delta.serialize(), format!("name,dt.metrics.source=opentelemetry count,delta=25 {}", NOW));
        assert_eq!(gauge.serialize(), format!("name,dt.metrics.source=opentelemetry gauge,25 {}", NOW));
        assert_eq!(summary.serialize(), "name,dt.metrics.source=opentelemetry gauge,min=1,max=5,sum=12,count=4");
    }

    #[test]
    fn test_prefix() {
        let factory = MetricFactory::new(Some("prefix"), &[]);
        let line = factory.create_total_counter("name", &[], 25.into(), None).unwrap();
        assert_eq!(line.serialize(), "prefix.name,dt.metrics.source=opentelemetry count,25");

        let empty_prefix = MetricFactory::new(Some(""), &[]);
        let line = empty_prefix.create_gauge("name", &[], 1.into(), None).unwrap();
        assert_eq!(line.key(), "name");
    }

    #[test]
    fn test_invalid_key() {
        let factory = MetricFactory::new(None, &[]);
        let err = factory.create_gauge("~~~", &[], 1.into(), None).unwrap_err();
        assert!(matches!(err, ExporterError::InvalidMetricKey(_)));
    }

    #[test]
    fn test_invalid_values() {
        let factory = MetricFactory::new(None, &[]);
        assert!(factory.create_gauge("g", &[], f64::NAN.into(), None).is_err());
        assert!(factory.create_delta_counter("c", &[], f64::INFINITY.into(), None).is_err());
        assert!(factory
            .create_summary("s", &[], SummaryValue::new(f64::NEG_INFINITY, 1.0, 1.0, 1), None)
            .is_err());
    }

    #[test]
    fn test_dimension_merge_order() {
        let factory = MetricFactory::new(
            None,
            &[Dimension::new("default", "d"), Dimension::new("shared", "from-default")],
        )
        .with_static_dimensions(&[Dimension::new("shared", "from-static"), Dimension::new("host", "h1")]);

        let line = factory
            .create_gauge(
                "g",
                &[Dimension::new("shared", "from-call"), Dimension::new("call", "c")],
                1.into(),
                None,
            )
            .unwrap();

        assert_eq!(
            line.dimensions(),
            &[
                Dimension::new("default", "d"),
                Dimension::new("shared", "from-static"),
                Dimension::new("call", "c"),
                Dimension::new("dt.metrics.source", "opentelemetry"),
                Dimension::new("host", "h1"),
            ]
        );
    }

    #[test]
    fn test_call_site_overrides_default() {
        let factory = MetricFactory::new(None, &[Dimension::new("env", "prod")]);
        let line = factory
            .create_delta_counter("c", &[Dimension::new("ENV", "dev")], 1.into(), None)
            .unwrap();
        assert_eq!(line.serialize(), "c,env=dev,dt.metrics.source=opentelemetry count,delta=1");
    }

    #[test]
    fn test_source_dimension_only_replaced_by_static() {
        let factory = MetricFactory::new(None, &[Dimension::new("dt.metrics.source", "default")]);
        let line = factory
            .create_gauge("g", &[Dimension::new("dt.metrics.source", "call")], 1.into(), None)
            .unwrap();
        assert_eq!(line.serialize(), "g,dt.metrics.source=opentelemetry gauge,1");

        let factory = factory.with_static_dimensions(&[Dimension::new("dt.metrics.source", "agent")]);
        let line = factory.create_gauge("g", &[], 1.into(), None).unwrap();
        assert_eq!(line.serialize(), "g,dt.metrics.source=agent gauge,1");
    }

    #[test]
    fn test_default_dimensions_are_normalized() {
        let factory = MetricFactory::new(
            None,
            &[
                Dimension::new("Dim Key", "a b"),
                Dimension::new("", "dropped"),
                Dimension::new("dim_key", "second"),
            ],
        );
        assert_eq!(factory.default_dimensions(), &[Dimension::new("dim_key", "second")]);
    }
}
