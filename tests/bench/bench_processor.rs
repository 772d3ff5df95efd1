//! Performance benchmark for batch reduction

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue, any_value};
use opentelemetry_proto::tonic::metrics::v1::{
    AggregationTemporality, Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum,
    metric::Data, number_data_point::Value,
};
use otlp_reduce_resolution::{ConfigBuilder, ReduceResolutionProcessor};

fn host_attr(series: usize) -> Vec<KeyValue> {
    vec![KeyValue {
        key: "host".to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(format!("host-{}", series))),
        }),
    }]
}

/// `series` gauge and sum series with `points` samples each
fn create_batch(series: usize, points: usize) -> ExportMetricsServiceRequest {
    let gauge_points = (0..series)
        .flat_map(|s| {
            (0..points).map(move |p| NumberDataPoint {
                attributes: host_attr(s),
                time_unix_nano: p as u64,
                value: Some(Value::AsDouble(p as f64 * 0.5)),
                ..Default::default()
            })
        })
        .collect();
    let sum_points = (0..series)
        .flat_map(|s| {
            (0..points).map(move |p| NumberDataPoint {
                attributes: host_attr(s),
                time_unix_nano: p as u64,
                value: Some(Value::AsInt(p as i64)),
                ..Default::default()
            })
        })
        .collect();

    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            scope_metrics: vec![ScopeMetrics {
                scope: Some(InstrumentationScope {
                    name: "bench".to_string(),
                    ..Default::default()
                }),
                metrics: vec![
                    Metric {
                        name: "cpu.temp".to_string(),
                        data: Some(Data::Gauge(Gauge {
                            data_points: gauge_points,
                        })),
                        ..Default::default()
                    },
                    Metric {
                        name: "requests".to_string(),
                        data: Some(Data::Sum(Sum {
                            data_points: sum_points,
                            aggregation_temporality: AggregationTemporality::Delta as i32,
                            is_monotonic: true,
                        })),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn bench_process(c: &mut Criterion) {
    let config = ConfigBuilder::new()
        .gauge_statistics("cpu.temp", ["avg", "min", "max", "count"])
        .build()
        .expect("valid bench config");
    let processor = ReduceResolutionProcessor::new(config);

    let mut group = c.benchmark_group("process_batch");
    for (series, points) in [(10, 60), (100, 60), (1000, 10)] {
        let batch = create_batch(series, points);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", series, points)),
            &batch,
            |b, batch| {
                b.iter(|| processor.process_at(black_box(batch.clone()), 1));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_process);
criterion_main!(benches);
