//! Conversion of OTLP metric messages into export snapshots.
//!
//! Only sums, gauges and explicit-bucket histograms have a line protocol
//! representation; exponential histograms and summaries are skipped.
//! Timestamps are not carried over, the ingest endpoint assigns them.

use crate::core::{ExporterError, Result};
use crate::metrics::{
    AttributeValue, DataPoint, HistogramValue, InstrumentKind, Metric, MetricData, Number,
    ResourceMetrics, ScopeMetrics, Temporality,
};
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::metrics::v1 as proto;
use opentelemetry_proto::tonic::metrics::v1::{metric::Data, number_data_point, AggregationTemporality};
use prost::Message;
use std::collections::BTreeMap;
use tracing::debug;

/// Decode a protobuf-encoded `ExportMetricsServiceRequest`
pub fn decode_request(bytes: &[u8]) -> Result<ResourceMetrics> {
    let request = ExportMetricsServiceRequest::decode(bytes)
        .map_err(|e| ExporterError::config(format!("Invalid OTLP metrics request: {}", e)))?;
    Ok(convert_request(&request))
}

/// Convert a full export request into one snapshot
pub fn convert_request(request: &ExportMetricsServiceRequest) -> ResourceMetrics {
    ResourceMetrics {
        scope_metrics: request
            .resource_metrics
            .iter()
            .flat_map(|resource| convert_resource_metrics(resource).scope_metrics)
            .collect(),
    }
}

/// Convert the metrics of one resource
pub fn convert_resource_metrics(resource: &proto::ResourceMetrics) -> ResourceMetrics {
    ResourceMetrics {
        scope_metrics: resource.scope_metrics.iter().map(convert_scope_metrics).collect(),
    }
}

fn convert_scope_metrics(scope: &proto::ScopeMetrics) -> ScopeMetrics {
    ScopeMetrics {
        scope: scope.scope.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
        metrics: scope.metrics.iter().filter_map(convert_metric).collect(),
    }
}

fn convert_metric(metric: &proto::Metric) -> Option<Metric> {
    let name = metric.name.clone();
    match metric.data.as_ref()? {
        Data::Sum(sum) => Some(Metric {
            name,
            kind: if sum.is_monotonic {
                InstrumentKind::Counter
            } else {
                InstrumentKind::UpDownCounter
            },
            temporality: convert_temporality(sum.aggregation_temporality),
            data: MetricData::Sum {
                is_monotonic: sum.is_monotonic,
                data_points: sum.data_points.iter().filter_map(convert_number_point).collect(),
            },
        }),
        Data::Gauge(gauge) => Some(Metric {
            name,
            kind: InstrumentKind::ObservableGauge,
            temporality: Temporality::Cumulative,
            data: MetricData::Gauge {
                data_points: gauge.data_points.iter().filter_map(convert_number_point).collect(),
            },
        }),
        Data::Histogram(histogram) => Some(Metric {
            name,
            kind: InstrumentKind::Histogram,
            temporality: convert_temporality(histogram.aggregation_temporality),
            data: MetricData::Histogram {
                data_points: histogram.data_points.iter().map(convert_histogram_point).collect(),
            },
        }),
        Data::ExponentialHistogram(_) | Data::Summary(_) => {
            debug!("Skipping metric '{}': unsupported data type", metric.name);
            None
        },
    }
}

fn convert_temporality(value: i32) -> Temporality {
    if value == AggregationTemporality::Delta as i32 {
        Temporality::Delta
    } else {
        Temporality::Cumulative
    }
}

fn convert_number_point(point: &proto::NumberDataPoint) -> Option<DataPoint<Number>> {
    let value = match point.value.as_ref()? {
        number_data_point::Value::AsDouble(v) => Number::F64(*v),
        number_data_point::Value::AsInt(v) => Number::I64(*v),
    };
    Some(DataPoint {
        attributes: convert_attributes(&point.attributes),
        value,
        timestamp_millis: None,
    })
}

fn convert_histogram_point(point: &proto::HistogramDataPoint) -> DataPoint<HistogramValue> {
    DataPoint {
        attributes: convert_attributes(&point.attributes),
        value: HistogramValue {
            count: point.count,
            sum: point.sum,
            min: point.min,
            max: point.max,
            bucket_boundaries: point.explicit_bounds.clone(),
            bucket_counts: point.bucket_counts.clone(),
        },
        timestamp_millis: None,
    }
}

fn convert_attributes(attributes: &[KeyValue]) -> BTreeMap<String, AttributeValue> {
    attributes
        .iter()
        .filter_map(|kv| {
            let value = kv.value.as_ref().and_then(convert_any_value)?;
            Some((kv.key.clone(), value))
        })
        .collect()
}

fn convert_any_value(value: &AnyValue) -> Option<AttributeValue> {
    match value.value.as_ref()? {
        any_value::Value::StringValue(s) => Some(AttributeValue::String(s.clone())),
        any_value::Value::BoolValue(b) => Some(AttributeValue::Bool(*b)),
        any_value::Value::IntValue(i) => Some(AttributeValue::I64(*i)),
        any_value::Value::DoubleValue(d) => Some(AttributeValue::F64(*d)),
        any_value::Value::ArrayValue(array) => Some(AttributeValue::Array(
            array.values.iter().filter_map(convert_any_value).collect(),
        )),
        any_value::Value::KvlistValue(_) | any_value::Value::BytesValue(_) => None,
    }
}
