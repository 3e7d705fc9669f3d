//! Metric model, normalization and line construction.
//!
//! Data flows leaf-first through this module:
//! - `types`: the snapshot handed to the exporter
//! - `normalize`: protocol-legal keys and escaped values
//! - `histogram`: summary estimation for bucketed distributions
//! - `factory` and `line`: validated lines and their serialization
//! - `enrichment`: host metadata dimensions

pub mod enrichment;
pub mod factory;
pub mod histogram;
pub mod line;
pub mod normalize;
pub mod types;

pub use enrichment::{read_metadata, read_metadata_from, METADATA_INDIRECTION_FILE};
pub use factory::{MetricFactory, SOURCE_DIMENSION_KEY, SOURCE_DIMENSION_VALUE};
pub use histogram::estimate_summary;
pub use line::{MetricLine, MetricValue, SummaryValue};
pub use normalize::{
    normalize_dimension, normalize_dimension_key, normalize_dimension_value, normalize_dimensions,
    normalize_metric_key,
};
pub use types::{
    AttributeValue, DataPoint, Dimension, HistogramValue, InstrumentKind, Metric, MetricData, Number,
    ResourceMetrics, ScopeMetrics, Temporality,
};
