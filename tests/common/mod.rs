//! Shared builders for OTLP metrics test batches

#![allow(dead_code)]

use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue, any_value};
use opentelemetry_proto::tonic::metrics::v1::{
    AggregationTemporality, Gauge, Histogram, HistogramDataPoint, Metric, NumberDataPoint,
    ResourceMetrics, ScopeMetrics, Sum, metric::Data, number_data_point::Value,
};
use opentelemetry_proto::tonic::resource::v1::Resource;

/// Emission time used by tests that call `process_at`
pub const NOW: u64 = 1_000_000;

pub fn string_attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        }),
    }
}

pub fn scope(name: &str, version: &str, attributes: Vec<KeyValue>) -> InstrumentationScope {
    InstrumentationScope {
        name: name.to_string(),
        version: version.to_string(),
        attributes,
        ..Default::default()
    }
}

pub fn resource(service: &str) -> Resource {
    Resource {
        attributes: vec![string_attr("service.name", service)],
        ..Default::default()
    }
}

pub fn int_point(start: u64, time: u64, value: i64, attributes: Vec<KeyValue>) -> NumberDataPoint {
    NumberDataPoint {
        attributes,
        start_time_unix_nano: start,
        time_unix_nano: time,
        value: Some(Value::AsInt(value)),
        ..Default::default()
    }
}

pub fn float_point(start: u64, time: u64, value: f64, attributes: Vec<KeyValue>) -> NumberDataPoint {
    NumberDataPoint {
        attributes,
        start_time_unix_nano: start,
        time_unix_nano: time,
        value: Some(Value::AsDouble(value)),
        ..Default::default()
    }
}

pub fn gauge(name: &str, unit: &str, points: Vec<NumberDataPoint>) -> Metric {
    Metric {
        name: name.to_string(),
        description: format!("{} description", name),
        unit: unit.to_string(),
        data: Some(Data::Gauge(Gauge {
            data_points: points,
        })),
        ..Default::default()
    }
}

pub fn sum(
    name: &str,
    temporality: AggregationTemporality,
    monotonic: bool,
    points: Vec<NumberDataPoint>,
) -> Metric {
    Metric {
        name: name.to_string(),
        description: format!("{} description", name),
        unit: "1".to_string(),
        data: Some(Data::Sum(Sum {
            data_points: points,
            aggregation_temporality: temporality as i32,
            is_monotonic: monotonic,
        })),
        ..Default::default()
    }
}

pub fn histogram_point(
    start: u64,
    time: u64,
    bounds: Vec<f64>,
    bucket_counts: Vec<u64>,
    sum: Option<f64>,
) -> HistogramDataPoint {
    HistogramDataPoint {
        start_time_unix_nano: start,
        time_unix_nano: time,
        count: bucket_counts.iter().sum(),
        sum,
        bucket_counts,
        explicit_bounds: bounds,
        ..Default::default()
    }
}

pub fn histogram(
    name: &str,
    temporality: AggregationTemporality,
    points: Vec<HistogramDataPoint>,
) -> Metric {
    Metric {
        name: name.to_string(),
        description: format!("{} description", name),
        unit: "ms".to_string(),
        data: Some(Data::Histogram(Histogram {
            data_points: points,
            aggregation_temporality: temporality as i32,
        })),
        ..Default::default()
    }
}

pub fn scope_metrics(scope: InstrumentationScope, metrics: Vec<Metric>) -> ScopeMetrics {
    ScopeMetrics {
        scope: Some(scope),
        metrics,
        ..Default::default()
    }
}

pub fn resource_metrics(resource: Resource, scopes: Vec<ScopeMetrics>) -> ResourceMetrics {
    ResourceMetrics {
        resource: Some(resource),
        scope_metrics: scopes,
        schema_url: "https://opentelemetry.io/schemas/1.24.0".to_string(),
    }
}

/// A batch with one resource holding one scope
pub fn single_scope_batch(metrics: Vec<Metric>) -> ExportMetricsServiceRequest {
    ExportMetricsServiceRequest {
        resource_metrics: vec![resource_metrics(
            resource("svc"),
            vec![scope_metrics(scope("meter", "1.0", vec![]), metrics)],
        )],
    }
}

/// All output metrics of the single output resource, flattened across scopes
pub fn output_metrics(out: &ExportMetricsServiceRequest) -> Vec<&Metric> {
    out.resource_metrics
        .iter()
        .flat_map(|rm| rm.scope_metrics.iter())
        .flat_map(|sm| sm.metrics.iter())
        .collect()
}

/// Find an output metric by name
pub fn find<'a>(out: &'a ExportMetricsServiceRequest, name: &str) -> &'a Metric {
    output_metrics(out)
        .into_iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("metric {} not found in output", name))
}

/// Gauge points of an output metric
pub fn gauge_points(metric: &Metric) -> &[NumberDataPoint] {
    match metric.data.as_ref() {
        Some(Data::Gauge(g)) => &g.data_points,
        other => panic!("expected gauge for {}, got {:?}", metric.name, other),
    }
}

/// Sum of an output metric
pub fn sum_data(metric: &Metric) -> &Sum {
    match metric.data.as_ref() {
        Some(Data::Sum(s)) => s,
        other => panic!("expected sum for {}, got {:?}", metric.name, other),
    }
}

/// Histogram of an output metric
pub fn histogram_data(metric: &Metric) -> &Histogram {
    match metric.data.as_ref() {
        Some(Data::Histogram(h)) => h,
        other => panic!("expected histogram for {}, got {:?}", metric.name, other),
    }
}

/// Value of the single point of an output gauge
pub fn gauge_value(metric: &Metric) -> Value {
    let points = gauge_points(metric);
    assert_eq!(points.len(), 1, "reduced gauge {} should have one point", metric.name);
    points[0].value.clone().expect("reduced gauge point has a value")
}
