//! dtmetrics - line-protocol metric exporter.
//!
//! Turns collected metric snapshots (counters, gauges, histograms) into the
//! line protocol and delivers them to an HTTP ingest endpoint in bounded
//! batches, retrying transport failures and stopping for good when the
//! endpoint rejects the credentials.
//!
//! # Architecture
//!
//! - `metrics`: data model, normalization, histogram estimation, line construction
//! - `export`: classification of points and batched delivery
//! - `otlp`: conversion of OTLP protobuf messages into snapshots
//! - `core`: configuration, errors and retry policy
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use dtmetrics::core::ExporterConfig;
//! use dtmetrics::export::{LineProtocolExporter, PushMetricExporter};
//! use dtmetrics::metrics::{DataPoint, Metric, ResourceMetrics, Temporality};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = LineProtocolExporter::new(&ExporterConfig::default())?;
//!     let snapshot = ResourceMetrics::single_scope(
//!         "app",
//!         vec![Metric::counter(
//!             "requests",
//!             Temporality::Delta,
//!             vec![DataPoint::new(5.into()).with_attribute("route", "/")],
//!         )],
//!     );
//!     exporter.export(&snapshot).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod export;
pub mod metrics;
pub mod otlp;

// Re-export core types for convenience
pub use crate::core::{Config, ExporterConfig, ExporterError, Result};
pub use crate::export::{LineProtocolExporter, PushMetricExporter};
