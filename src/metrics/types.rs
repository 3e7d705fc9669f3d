//! Input data model: the snapshot of measured points handed to the exporter
//! once per collection cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A key/value attribute attached to a metric line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Dimension key
    pub key: String,
    /// Dimension value
    pub value: String,
}

impl Dimension {
    /// Create a new dimension
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Whether a reported value is a change since the last report or a running total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temporality {
    /// Change since the previous collection
    Delta,
    /// Total since the start of the process
    Cumulative,
}

/// Instrument kinds the host SDK creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Synchronous monotonic counter
    Counter,
    /// Synchronous counter that may decrease
    UpDownCounter,
    /// Synchronous histogram
    Histogram,
    /// Synchronous gauge
    Gauge,
    /// Asynchronous monotonic counter
    ObservableCounter,
    /// Asynchronous counter that may decrease
    ObservableUpDownCounter,
    /// Asynchronous gauge
    ObservableGauge,
}

/// A numeric measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Signed integer value
    I64(i64),
    /// Unsigned integer value
    U64(u64),
    /// Floating point value
    F64(f64),
}

impl Number {
    /// Returns false for NaN and infinite floating point values
    pub fn is_finite(&self) -> bool {
        match self {
            Number::I64(_) | Number::U64(_) => true,
            Number::F64(v) => v.is_finite(),
        }
    }

    /// Returns the value as a float
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::I64(v) => v as f64,
            Number::U64(v) => v as f64,
            Number::F64(v) => v,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(v) => write!(f, "{}", v),
            Number::U64(v) => write!(f, "{}", v),
            Number::F64(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::I64(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::I64(i64::from(v))
    }
}

impl From<u64> for Number {
    fn from(v: u64) -> Self {
        Number::U64(v)
    }
}

impl From<u32> for Number {
    fn from(v: u32) -> Self {
        Number::U64(u64::from(v))
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::F64(v)
    }
}

/// Attribute value as recorded by the instrumentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean attribute
    Bool(bool),
    /// Integer attribute
    I64(i64),
    /// Floating point attribute
    F64(f64),
    /// String attribute
    String(String),
    /// Array attribute; has no line protocol representation
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Textual form used as a dimension value, `None` for unsupported kinds
    pub fn as_dimension_value(&self) -> Option<String> {
        match self {
            AttributeValue::Bool(v) => Some(v.to_string()),
            AttributeValue::I64(v) => Some(v.to_string()),
            AttributeValue::F64(v) => Some(v.to_string()),
            AttributeValue::String(v) => Some(v.clone()),
            AttributeValue::Array(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::I64(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::F64(v)
    }
}

/// A bucketed distribution as produced by a histogram aggregation.
///
/// `bucket_counts` holds one more entry than `bucket_boundaries`: bucket `i`
/// covers `(boundaries[i - 1], boundaries[i]]`, the first bucket has no
/// lower bound and the last bucket has no upper bound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistogramValue {
    /// Number of recorded values
    pub count: u64,
    /// Exact sum of recorded values, if known
    pub sum: Option<f64>,
    /// Exact minimum, if known
    pub min: Option<f64>,
    /// Exact maximum, if known
    pub max: Option<f64>,
    /// Upper bounds of all but the last bucket, ascending
    #[serde(default)]
    pub bucket_boundaries: Vec<f64>,
    /// Per-bucket counts
    #[serde(default)]
    pub bucket_counts: Vec<u64>,
}

impl HistogramValue {
    /// Create a histogram from boundaries and counts; `count` is their total.
    pub fn new(bucket_boundaries: Vec<f64>, bucket_counts: Vec<u64>) -> Self {
        let count = bucket_counts.iter().sum();
        Self {
            count,
            bucket_boundaries,
            bucket_counts,
            ..Self::default()
        }
    }

    /// Set the exact sum
    pub fn with_sum(mut self, sum: f64) -> Self {
        self.sum = Some(sum);
        self
    }

    /// Set the exact minimum and maximum
    pub fn with_extrema(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// A single measured point with its attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint<T> {
    /// Attributes recorded with the measurement
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Measured value
    pub value: T,
    /// Observation time in milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp_millis: Option<u64>,
}

impl<T> DataPoint<T> {
    /// Create a point without attributes or timestamp
    pub fn new(value: T) -> Self {
        Self {
            attributes: BTreeMap::new(),
            value,
            timestamp_millis: None,
        }
    }

    /// Add an attribute
    pub fn with_attribute<K: Into<String>, V: Into<AttributeValue>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the observation time
    pub fn with_timestamp(mut self, timestamp_millis: u64) -> Self {
        self.timestamp_millis = Some(timestamp_millis);
        self
    }
}

/// Aggregated data of one instrument, by data kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricData {
    /// Sum aggregation (counters and up-down counters)
    Sum {
        /// Whether the sum only ever increases
        is_monotonic: bool,
        /// Aggregated points
        data_points: Vec<DataPoint<Number>>,
    },
    /// Last-value aggregation
    Gauge {
        /// Aggregated points
        data_points: Vec<DataPoint<Number>>,
    },
    /// Explicit bucket histogram aggregation
    Histogram {
        /// Aggregated points
        data_points: Vec<DataPoint<HistogramValue>>,
    },
}

impl MetricData {
    /// Number of data points
    pub fn len(&self) -> usize {
        match self {
            MetricData::Sum { data_points, .. } | MetricData::Gauge { data_points } => {
                data_points.len()
            },
            MetricData::Histogram { data_points } => data_points.len(),
        }
    }

    /// True when there are no data points
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One instrument's collected data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Instrument name
    pub name: String,
    /// Instrument kind
    pub kind: InstrumentKind,
    /// Temporality of the aggregated points
    pub temporality: Temporality,
    /// Aggregated points
    pub data: MetricData,
}

impl Metric {
    /// Monotonic counter data
    pub fn counter<N: Into<String>>(name: N, temporality: Temporality, data_points: Vec<DataPoint<Number>>) -> Self {
        Self {
            name: name.into(),
            kind: InstrumentKind::Counter,
            temporality,
            data: MetricData::Sum {
                is_monotonic: true,
                data_points,
            },
        }
    }

    /// Up-down counter data
    pub fn up_down_counter<N: Into<String>>(name: N, temporality: Temporality, data_points: Vec<DataPoint<Number>>) -> Self {
        Self {
            name: name.into(),
            kind: InstrumentKind::UpDownCounter,
            temporality,
            data: MetricData::Sum {
                is_monotonic: false,
                data_points,
            },
        }
    }

    /// Gauge data
    pub fn gauge<N: Into<String>>(name: N, temporality: Temporality, data_points: Vec<DataPoint<Number>>) -> Self {
        Self {
            name: name.into(),
            kind: InstrumentKind::ObservableGauge,
            temporality,
            data: MetricData::Gauge { data_points },
        }
    }

    /// Histogram data
    pub fn histogram<N: Into<String>>(name: N, temporality: Temporality, data_points: Vec<DataPoint<HistogramValue>>) -> Self {
        Self {
            name: name.into(),
            kind: InstrumentKind::Histogram,
            temporality,
            data: MetricData::Histogram { data_points },
        }
    }
}

/// Metrics produced by one instrumentation scope
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeMetrics {
    /// Instrumentation scope name
    #[serde(default)]
    pub scope: String,
    /// Instruments of the scope
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

/// A full collection snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceMetrics {
    /// Per-scope metric data
    #[serde(default)]
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    /// Snapshot holding a single scope
    pub fn single_scope<S: Into<String>>(scope: S, metrics: Vec<Metric>) -> Self {
        Self {
            scope_metrics: vec![ScopeMetrics {
                scope: scope.into(),
                metrics,
            }],
        }
    }

    /// Total number of data points across all scopes
    pub fn point_count(&self) -> usize {
        self.scope_metrics
            .iter()
            .flat_map(|scope| scope.metrics.iter())
            .map(|metric| metric.data.len())
            .sum()
    }

    /// Iterate over every instrument of every scope
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.scope_metrics.iter().flat_map(|scope| scope.metrics.iter())
    }
}
