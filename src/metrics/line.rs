//! Metric lines and their text serialization.
//!
//! A line is `<key>[,<dim>=<val>...] <value clause>[ <timestamp>]`.

use crate::metrics::types::{Dimension, Number};
use std::fmt;

/// Summary statistics of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryValue {
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Sum of all values
    pub sum: f64,
    /// Number of values
    pub count: u64,
}

impl SummaryValue {
    /// Create a summary
    pub fn new(min: f64, max: f64, sum: f64, count: u64) -> Self {
        Self { min, max, sum, count }
    }

    /// Mean value, `None` for an empty summary
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.sum.is_finite()
    }
}

/// Typed value of a metric line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Running total of a count
    TotalCounter(Number),
    /// Change of a count since the previous report
    DeltaCounter(Number),
    /// Point-in-time measurement
    Gauge(Number),
    /// Min/max/sum/count of a distribution
    Summary(SummaryValue),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::TotalCounter(v) => write!(f, "count,{}", v),
            MetricValue::DeltaCounter(v) => write!(f, "count,delta={}", v),
            MetricValue::Gauge(v) => write!(f, "gauge,{}", v),
            MetricValue::Summary(s) => write!(
                f,
                "gauge,min={},max={},sum={},count={}",
                s.min, s.max, s.sum, s.count
            ),
        }
    }
}

/// A validated, immutable metric line.
///
/// Lines are built by [`MetricFactory`](crate::metrics::MetricFactory),
/// which guarantees a normalized key and normalized, unique dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    key: String,
    dimensions: Vec<Dimension>,
    value: MetricValue,
    timestamp_millis: Option<u64>,
}

impl MetricLine {
    pub(crate) fn new(
        key: String,
        dimensions: Vec<Dimension>,
        value: MetricValue,
        timestamp_millis: Option<u64>,
    ) -> Self {
        Self {
            key,
            dimensions,
            value,
            timestamp_millis,
        }
    }

    /// Normalized metric key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Normalized dimensions in output order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Line value
    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    /// Timestamp in milliseconds since the Unix epoch
    pub fn timestamp_millis(&self) -> Option<u64> {
        self.timestamp_millis
    }

    /// Serialize into the line protocol
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)?;
        for dimension in &self.dimensions {
            write!(f, ",{}={}", dimension.key, dimension.value)?;
        }
        write!(f, " {}", self.value)?;
        if let Some(timestamp) = self.timestamp_millis {
            write!(f, " {}", timestamp)?;
        }
        Ok(())
    }
}
