//! Batch orchestrator
//!
//! Walks one `ExportMetricsServiceRequest`, folds every data point into a
//! per-scope accumulator and re-assembles a single-resource request holding
//! the summaries.
//!
//! # Example
//!
//! ```
//! use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
//! use otlp_reduce_resolution::{Config, ReduceResolutionProcessor};
//!
//! let processor = ReduceResolutionProcessor::new(Config::default());
//! let empty = ExportMetricsServiceRequest::default();
//! let out = processor.process(empty.clone());
//! assert_eq!(out, empty);
//! ```

use crate::aggregation::{MetricDescriptor, ScopeAccumulator, Temporality, scope_key};
use crate::config::{Config, GaugeStatistics};
use crate::error::MergeError;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::metrics::v1::{Metric, ResourceMetrics, metric::Data};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Reduces the resolution of metric batches
///
/// Holds only configuration; every call builds and drops its own
/// aggregation state, so one processor can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct ReduceResolutionProcessor {
    statistics: GaugeStatistics,
    aggregate_histograms: bool,
    propagate_scope_attributes: bool,
}

impl ReduceResolutionProcessor {
    /// Create a processor from configuration
    pub fn new(config: Config) -> Self {
        Self {
            statistics: config.gauge_statistics(),
            aggregate_histograms: config.aggregate_histograms,
            propagate_scope_attributes: config.propagate_scope_attributes,
        }
    }

    /// Reduce one batch, stamping every output point with the current time
    pub fn process(&self, request: ExportMetricsServiceRequest) -> ExportMetricsServiceRequest {
        self.process_at(request, now_unix_nano())
    }

    /// Reduce one batch, stamping every output point with `time_unix_nano`
    pub fn process_at(
        &self,
        request: ExportMetricsServiceRequest,
        time_unix_nano: u64,
    ) -> ExportMetricsServiceRequest {
        if request.resource_metrics.is_empty() {
            return request;
        }

        let input_resources = request.resource_metrics.len();
        let mut resource_metrics = request.resource_metrics.into_iter();
        let Some(first) = resource_metrics.next() else {
            return ExportMetricsServiceRequest::default();
        };
        let resource = first.resource.clone();
        let schema_url = first.schema_url.clone();

        let mut fold = BatchFold::default();
        for rm in std::iter::once(first).chain(resource_metrics) {
            for sm in rm.scope_metrics {
                let scope = sm.scope.unwrap_or_default();
                let accumulator = fold.accumulator(&scope);
                for metric in sm.metrics {
                    self.fold_metric(accumulator, metric);
                }
            }
        }

        let scope_metrics: Vec<_> = fold
            .scopes
            .into_iter()
            .map(|acc| acc.render(time_unix_nano, &self.statistics, self.propagate_scope_attributes))
            .collect();

        debug!(
            input_resources,
            output_scopes = scope_metrics.len(),
            output_metrics = scope_metrics.iter().map(|s| s.metrics.len()).sum::<usize>(),
            "Reduced metrics batch"
        );

        ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                resource,
                scope_metrics,
                schema_url,
            }],
        }
    }

    fn fold_metric(&self, accumulator: &mut ScopeAccumulator, metric: Metric) {
        let descriptor = MetricDescriptor::from_metric(&metric);
        match &metric.data {
            Some(Data::Gauge(gauge)) => {
                for point in &gauge.data_points {
                    accumulator.add_gauge_point(&descriptor, point);
                }
            }
            Some(Data::Sum(sum)) => {
                let Some(temporality) = Temporality::from_proto(sum.aggregation_temporality) else {
                    debug!(
                        metric = %descriptor.name,
                        aggregation_temporality = sum.aggregation_temporality,
                        "Passing through sum with unspecified temporality"
                    );
                    accumulator.add_passthrough(metric);
                    return;
                };
                for point in &sum.data_points {
                    if let Err(e) =
                        accumulator.add_counter_point(&descriptor, temporality, sum.is_monotonic, point)
                    {
                        log_rejected_point(&descriptor, "sum", &e);
                    }
                }
            }
            Some(Data::Histogram(histogram)) if self.aggregate_histograms => {
                let Some(temporality) = Temporality::from_proto(histogram.aggregation_temporality)
                else {
                    debug!(
                        metric = %descriptor.name,
                        aggregation_temporality = histogram.aggregation_temporality,
                        "Passing through histogram with unspecified temporality"
                    );
                    accumulator.add_passthrough(metric);
                    return;
                };
                for point in &histogram.data_points {
                    if let Err(e) = accumulator.add_histogram_point(&descriptor, temporality, point) {
                        log_rejected_point(&descriptor, "histogram", &e);
                    }
                }
            }
            _ => accumulator.add_passthrough(metric),
        }
    }
}

/// Scope accumulators of one call, in first-seen order of their keys
#[derive(Default)]
struct BatchFold {
    index: HashMap<String, usize>,
    scopes: Vec<ScopeAccumulator>,
}

impl BatchFold {
    fn accumulator(&mut self, scope: &InstrumentationScope) -> &mut ScopeAccumulator {
        let next = self.scopes.len();
        let idx = *self.index.entry(scope_key(scope)).or_insert(next);
        if idx == next {
            self.scopes.push(ScopeAccumulator::new(scope));
        }
        &mut self.scopes[idx]
    }
}

fn log_rejected_point(descriptor: &MetricDescriptor, kind: &'static str, error: &MergeError) {
    warn!(
        metric = %descriptor.name,
        kind,
        error = %error,
        "Dropping data point that cannot be merged into its series"
    );
}

fn now_unix_nano() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or_default()
}
